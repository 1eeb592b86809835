//! Assembly of [`MarketStats`] from a book, its price history and trades.

use crate::domain::{MarketStats, OrderBook, PricePoint, Trade};

use super::{
    DEFAULT_DEPTH_LEVELS, DEFAULT_GAP_THRESHOLD, DEFAULT_LIQUIDITY_THRESHOLD, calculate_depth,
    calculate_depth_skew, calculate_price_slope, calculate_spread, calculate_spread_percent,
    calculate_volatility, detect_liquidity_gap, find_liquidity_walls, price_change_since,
    volume_24h,
};

/// Tunables for metric derivation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyticsParams {
    /// Number of price levels aggregated into depth.
    pub depth_levels: usize,
    /// Minimum level size that counts as a wall.
    pub liquidity_threshold: f64,
    /// Minimum price distance that counts as a gap.
    pub gap_threshold: f64,
}

impl Default for AnalyticsParams {
    fn default() -> Self {
        Self {
            depth_levels: DEFAULT_DEPTH_LEVELS,
            liquidity_threshold: DEFAULT_LIQUIDITY_THRESHOLD,
            gap_threshold: DEFAULT_GAP_THRESHOLD,
        }
    }
}

impl MarketStats {
    /// Derives every metric for `order_book` as of `now_ms`.
    pub fn derive(
        order_book: &OrderBook,
        history: &[PricePoint],
        trades: &[Trade],
        params: &AnalyticsParams,
        now_ms: i64,
    ) -> Self {
        let depth = calculate_depth(order_book, params.depth_levels);
        let prices: Vec<f64> = history.iter().map(|point| point.p).collect();

        Self {
            asset_id: order_book.asset_id.clone(),
            market: order_book.market.clone(),
            timestamp: order_book.timestamp,
            bid_depth: depth.bid_depth,
            ask_depth: depth.ask_depth,
            depth_skew: calculate_depth_skew(depth.bid_depth, depth.ask_depth),
            spread: calculate_spread(order_book),
            spread_percent: calculate_spread_percent(order_book),
            liquidity_walls: find_liquidity_walls(order_book, params.liquidity_threshold),
            liquidity_gap: detect_liquidity_gap(order_book, params.gap_threshold),
            price_change_1h: price_change_since(history, 1.0, now_ms),
            price_change_6h: price_change_since(history, 6.0, now_ms),
            price_change_24h: price_change_since(history, 24.0, now_ms),
            price_slope: calculate_price_slope(history),
            volatility: calculate_volatility(&prices),
            volume_24h: volume_24h(trades, now_ms.div_euclid(1000)),
        }
    }
}
