//! Statistics over price series and trades.

use rust_decimal::Decimal;

use crate::domain::{PricePoint, Trade};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;
const SECONDS_PER_DAY: i64 = 86_400;

/// Simple moving average over a left-aligned sliding window.
///
/// The output has `max(0, prices.len() - period + 1)` entries. A zero
/// `period` yields `prices.len() + 1` entries of `NaN`.
pub fn calculate_sma(prices: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        // Every window is empty: 0 / 0.
        return vec![f64::NAN; prices.len() + 1];
    }
    prices
        .windows(period)
        .map(|window| window.iter().sum::<f64>() / period as f64)
        .collect()
}

/// Population standard deviation. Fewer than two points yield `0`.
pub fn calculate_volatility(prices: &[f64]) -> f64 {
    if prices.len() < 2 {
        return 0.0;
    }

    let n = prices.len() as f64;
    let mean = prices.iter().sum::<f64>() / n;
    let variance = prices.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;

    variance.sqrt()
}

/// Return on investment in percent. Zero investment yields `0`.
pub fn calculate_roi(invested: f64, returned: f64) -> f64 {
    if invested == 0.0 {
        return 0.0;
    }
    (returned - invested) / invested * 100.0
}

/// Percent change from `old_price` to `new_price`. A zero base yields `0`.
pub fn calculate_price_change(old_price: f64, new_price: f64) -> f64 {
    if old_price == 0.0 {
        return 0.0;
    }
    (new_price - old_price) / old_price * 100.0
}

/// Least-squares slope of price against sample index.
///
/// The regressor is the position in the series, not the timestamp, so the
/// result is only meaningful for evenly sampled histories.
pub fn calculate_price_slope(points: &[PricePoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    let n = points.len() as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2) = (0.0, 0.0, 0.0, 0.0);

    for (index, point) in points.iter().enumerate() {
        let x = index as f64;
        let y = point.p;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
    }

    (n * sum_xy - sum_x * sum_y) / (n * sum_x2 - sum_x * sum_x)
}

/// Percent change between the price `hours_ago` and the latest price.
///
/// The reference point is the first sample at or after the cutoff. Returns
/// `0` when no sample qualifies, when the reference is the latest sample, or
/// when the reference price is zero.
pub fn price_change_since(points: &[PricePoint], hours_ago: f64, now_ms: i64) -> f64 {
    let Some(latest) = points.last() else {
        return 0.0;
    };

    let cutoff_ms = now_ms as f64 - hours_ago * MILLIS_PER_HOUR;
    let Some(index) = points.iter().position(|p| (p.t as f64) * 1000.0 >= cutoff_ms) else {
        return 0.0;
    };

    if index == points.len() - 1 {
        return 0.0;
    }

    calculate_price_change(points[index].p, latest.p)
}

/// Traded notional over the 24 hours before `now_secs`.
///
/// Trades with malformed price, size or match time are skipped, as are
/// trades whose notional overflows. The total saturates.
pub fn volume_24h(trades: &[Trade], now_secs: i64) -> Decimal {
    let since = now_secs - SECONDS_PER_DAY;
    trades
        .iter()
        .filter(|trade| trade.matched_at().is_some_and(|t| t > since))
        .filter_map(Trade::notional)
        .fold(Decimal::ZERO, |total, notional| total.saturating_add(notional))
}
