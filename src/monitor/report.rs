//! Plain-text market report.

use rust_decimal::prelude::ToPrimitive;

use crate::domain::MarketStats;
use crate::format::{
    format_address, format_compact_number, format_currency, format_number, format_percent,
    format_price, format_timestamp,
};

fn price_or_dash(price: Option<f64>) -> String {
    price.map(format_price).unwrap_or_else(|| "-".to_string())
}

/// Renders a snapshot as a multi-line report headed by `label`.
pub fn render_report(label: &str, stats: &MarketStats) -> String {
    let gap = match stats.liquidity_gap {
        Some(gap) => format!("{} to {}", format_price(gap.from), format_price(gap.to)),
        None => "none".to_string(),
    };

    let lines = [
        format!("{} [{}]", label, format_address(&stats.asset_id)),
        format!("  as of       {} UTC", format_timestamp(stats.timestamp)),
        format!(
            "  spread      {} ({})",
            format_price(stats.spread),
            format_percent(stats.spread_percent, 2)
        ),
        format!(
            "  depth       bids {} / asks {} (skew {:+.3})",
            format_number(stats.bid_depth, 0),
            format_number(stats.ask_depth, 0),
            stats.depth_skew
        ),
        format!(
            "  walls       support {} / resistance {}",
            price_or_dash(stats.liquidity_walls.support),
            price_or_dash(stats.liquidity_walls.resistance)
        ),
        format!("  gap         {}", gap),
        format!(
            "  change      1h {} / 6h {} / 24h {}",
            format_percent(stats.price_change_1h, 2),
            format_percent(stats.price_change_6h, 2),
            format_percent(stats.price_change_24h, 2)
        ),
        format!(
            "  trend       slope {:.6} / volatility {:.4}",
            stats.price_slope, stats.volatility
        ),
        format!(
            "  volume 24h  {} ({} USDC)",
            format_currency(stats.volume_24h.to_f64().unwrap_or(0.0)),
            format_compact_number(stats.volume_24h.to_f64().unwrap_or(0.0))
        ),
    ];

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LiquidityGap, LiquidityWalls};
    use rust_decimal::Decimal;

    fn sample() -> MarketStats {
        MarketStats {
            asset_id: "71321045679252212594626385532706912750332728571942532289631379312455583992563"
                .to_string(),
            market: "0xcond".to_string(),
            timestamp: 1_700_000_000_000,
            bid_depth: 1500.0,
            ask_depth: 1100.0,
            depth_skew: 0.153846,
            spread: 0.02,
            spread_percent: 4.347826,
            liquidity_walls: LiquidityWalls {
                support: Some(0.45),
                resistance: None,
            },
            liquidity_gap: Some(LiquidityGap { from: 0.3, to: 0.5 }),
            price_change_1h: 1.5,
            price_change_6h: -2.25,
            price_change_24h: 10.0,
            price_slope: 0.0005,
            volatility: 0.0123,
            volume_24h: Decimal::new(1_250_000, 0),
        }
    }

    #[test]
    fn test_render_report() {
        let report = render_report("Election YES", &sample());

        assert!(report.starts_with("Election YES [713210...2563]"));
        assert!(report.contains("as of       2023-11-14 22:13:20 UTC"));
        assert!(report.contains("spread      2.0¢ (+4.35%)"));
        assert!(report.contains("bids 1,500 / asks 1,100 (skew +0.154)"));
        assert!(report.contains("support 45.0¢ / resistance -"));
        assert!(report.contains("gap         30.0¢ to 50.0¢"));
        assert!(report.contains("1h +1.50% / 6h -2.25% / 24h +10.00%"));
        assert!(report.contains("$1.25M (1.3M USDC)"));
    }

    #[test]
    fn test_render_report_without_gap() {
        let mut stats = sample();
        stats.liquidity_gap = None;
        assert!(render_report("x", &stats).contains("gap         none"));
    }
}
