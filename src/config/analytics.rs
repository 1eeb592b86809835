//! Metric derivation and polling configuration.

use serde::Deserialize;
use std::time::Duration;

use super::duration;
use crate::analytics::{
    AnalyticsParams, DEFAULT_DEPTH_LEVELS, DEFAULT_GAP_THRESHOLD, DEFAULT_LIQUIDITY_THRESHOLD,
};

/// Analytics settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    /// Price levels aggregated into depth.
    #[serde(default = "default_depth_levels")]
    pub depth_levels: usize,
    /// Level size treated as a liquidity wall.
    #[serde(default = "default_liquidity_threshold")]
    pub liquidity_threshold: f64,
    /// Price distance treated as a liquidity gap.
    #[serde(default = "default_gap_threshold")]
    pub gap_threshold: f64,
    /// Price history interval passed to the CLOB ("1h", "1d", "1w", "max").
    #[serde(default = "default_history_interval")]
    pub history_interval: String,
    /// Price history resolution in minutes.
    #[serde(default = "default_history_fidelity")]
    pub history_fidelity: u32,
    /// Number of recent trades fetched for volume.
    #[serde(default = "default_trade_limit")]
    pub trade_limit: u32,
    /// Interval between polling cycles.
    #[serde(default = "default_poll_interval", with = "duration")]
    pub poll_interval: Duration,
}

impl AnalyticsConfig {
    /// Derivation parameters for [`crate::domain::MarketStats::derive`].
    pub fn params(&self) -> AnalyticsParams {
        AnalyticsParams {
            depth_levels: self.depth_levels,
            liquidity_threshold: self.liquidity_threshold,
            gap_threshold: self.gap_threshold,
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            depth_levels: default_depth_levels(),
            liquidity_threshold: default_liquidity_threshold(),
            gap_threshold: default_gap_threshold(),
            history_interval: default_history_interval(),
            history_fidelity: default_history_fidelity(),
            trade_limit: default_trade_limit(),
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_depth_levels() -> usize {
    DEFAULT_DEPTH_LEVELS
}

fn default_liquidity_threshold() -> f64 {
    DEFAULT_LIQUIDITY_THRESHOLD
}

fn default_gap_threshold() -> f64 {
    DEFAULT_GAP_THRESHOLD
}

fn default_history_interval() -> String {
    "1d".to_string()
}

fn default_history_fidelity() -> u32 {
    1000
}

fn default_trade_limit() -> u32 {
    1000
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(10)
}
