//! Derived market metrics.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregate resting size on each side of the book.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Depth {
    pub bid_depth: f64,
    pub ask_depth: f64,
}

/// Prices of the first levels that meet the wall threshold.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LiquidityWalls {
    pub support: Option<f64>,
    pub resistance: Option<f64>,
}

/// A price interval with no resting liquidity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidityGap {
    pub from: f64,
    pub to: f64,
}

/// MarketStats bundles every metric derived for one token at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStats {
    pub asset_id: String,
    pub market: String,
    /// Snapshot time of the underlying order book, unix milliseconds.
    pub timestamp: i64,
    pub bid_depth: f64,
    pub ask_depth: f64,
    /// Normalized imbalance in `[-1, 1]`, positive when bids dominate.
    pub depth_skew: f64,
    pub spread: f64,
    pub spread_percent: f64,
    pub liquidity_walls: LiquidityWalls,
    pub liquidity_gap: Option<LiquidityGap>,
    pub price_change_1h: f64,
    pub price_change_6h: f64,
    pub price_change_24h: f64,
    /// Least-squares slope of price per sample.
    pub price_slope: f64,
    pub volatility: f64,
    /// Traded notional over the trailing 24 hours.
    pub volume_24h: Decimal,
}
