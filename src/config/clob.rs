//! CLOB REST API configuration.

use serde::Deserialize;
use std::time::Duration;

use super::duration;

/// Production CLOB endpoint.
pub const DEFAULT_BASE_URL: &str = "https://clob.polymarket.com";

/// REST client settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ClobConfig {
    /// Base URL of the CLOB API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Maximum requests per minute.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: i64,
    /// Per-request timeout.
    #[serde(default = "default_timeout", with = "duration")]
    pub timeout: Duration,
}

impl Default for ClobConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            rate_limit: default_rate_limit(),
            timeout: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_rate_limit() -> i64 {
    100
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}
