//! Order book metrics and price-series statistics.
//!
//! Every function here is pure: inputs are already-fetched snapshots, outputs
//! are plain numbers. Malformed decimal strings surface as `NaN` rather than
//! errors, and empty ladders resolve to `0` or `None`.

mod depth;
mod liquidity;
mod series;
mod snapshot;
mod spread;

pub use depth::{calculate_depth, calculate_depth_skew};
pub use liquidity::{detect_liquidity_gap, find_liquidity_walls};
pub use series::{
    calculate_price_change, calculate_price_slope, calculate_roi, calculate_sma,
    calculate_volatility, price_change_since, volume_24h,
};
pub use snapshot::AnalyticsParams;
pub use spread::{calculate_spread, calculate_spread_percent};

/// Default number of levels aggregated into depth.
pub const DEFAULT_DEPTH_LEVELS: usize = 10;

/// Default size at which a level is treated as a wall.
pub const DEFAULT_LIQUIDITY_THRESHOLD: f64 = 50_000.0;

/// Default price distance treated as a gap.
pub const DEFAULT_GAP_THRESHOLD: f64 = 0.05;
