//! Configuration loading and validation.
//!
//! Uses serde_yaml to load YAML configuration files. A `.env` file is read
//! first so `CLOB_BASE_URL` can override the configured endpoint.

mod analytics;
mod app;
mod clob;
mod duration;
mod error;
mod storage;
mod websocket;

pub use analytics::AnalyticsConfig;
pub use app::AppConfig;
pub use clob::{ClobConfig, DEFAULT_BASE_URL};
pub use error::ConfigError;
pub use storage::StorageConfig;
pub use websocket::{DEFAULT_WS_URL, WebSocketConfig};

use serde::Deserialize;
use std::{env, fs};

/// Environment variable that overrides `clob.base_url`.
const BASE_URL_ENV: &str = "CLOB_BASE_URL";

/// A tracked outcome token.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarketConfig {
    /// CLOB token id of the outcome.
    pub token_id: String,
    /// Market (condition) id, used to fetch trades.
    pub market: Option<String>,
    /// Human-readable label for logs and reports.
    pub label: Option<String>,
}

impl MarketConfig {
    /// Label for display, falling back to the token id.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.token_id)
    }
}

/// Root configuration.
///
/// Required sections: app, markets.
/// Optional sections: clob, websocket, analytics, storage.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Application-level settings like name and environment.
    pub app: AppConfig,
    /// CLOB REST API settings.
    #[serde(default)]
    pub clob: ClobConfig,
    /// Real-time feed settings.
    #[serde(default)]
    pub websocket: WebSocketConfig,
    /// Metric thresholds and polling cadence.
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    /// Snapshot persistence (optional).
    pub storage: Option<StorageConfig>,
    /// Tokens to monitor.
    pub markets: Vec<MarketConfig>,
}

impl Config {
    /// Load configuration from a YAML file at the given path.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore error if not found)
        dotenvy::dotenv().ok();

        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_string(),
            source,
        })?;
        let mut config: Config = serde_yaml::from_str(&content)?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = env::var(BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                self.clob.base_url = base_url.trim().to_string();
            }
        }
    }

    /// Returns the storage settings when persistence is enabled.
    pub fn enabled_storage(&self) -> Option<&StorageConfig> {
        self.storage.as_ref().filter(|s| s.enabled)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.app.name.trim().is_empty() {
            return Err(ConfigError::Validation("app.name is required".into()));
        }

        if self.markets.is_empty() {
            return Err(ConfigError::Validation(
                "at least one market is required".into(),
            ));
        }

        for (i, market) in self.markets.iter().enumerate() {
            if market.token_id.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "markets[{}]: token_id is required",
                    i
                )));
            }
        }

        if self.clob.base_url.trim().is_empty() {
            return Err(ConfigError::Validation("clob.base_url is required".into()));
        }

        if self.clob.rate_limit <= 0 {
            return Err(ConfigError::Validation(
                "clob.rate_limit must be positive".into(),
            ));
        }

        if self.websocket.enabled && self.websocket.url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "websocket.url is required when the feed is enabled".into(),
            ));
        }

        let analytics = &self.analytics;
        if analytics.depth_levels == 0 {
            return Err(ConfigError::Validation(
                "analytics.depth_levels must be positive".into(),
            ));
        }

        if analytics.liquidity_threshold.is_nan() || analytics.liquidity_threshold < 0.0 {
            return Err(ConfigError::Validation(
                "analytics.liquidity_threshold must be non-negative".into(),
            ));
        }

        if analytics.gap_threshold.is_nan() || analytics.gap_threshold < 0.0 {
            return Err(ConfigError::Validation(
                "analytics.gap_threshold must be non-negative".into(),
            ));
        }

        if analytics.poll_interval.is_zero() {
            return Err(ConfigError::Validation(
                "analytics.poll_interval must be positive".into(),
            ));
        }

        if let Some(storage) = self.enabled_storage() {
            if storage.path().trim().is_empty() {
                return Err(ConfigError::Validation("storage.path is required".into()));
            }
            if storage.max_connections() == 0 {
                return Err(ConfigError::Validation(
                    "storage.max_connections must be positive".into(),
                ));
            }
        }

        Ok(())
    }
}
