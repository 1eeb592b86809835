//! WebSocket feed configuration.

use serde::Deserialize;
use std::time::Duration;

use super::duration;

/// Public subscriptions endpoint.
pub const DEFAULT_WS_URL: &str = "wss://ws-subscriptions-clob.polymarket.com/ws";

/// WebSocket connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Whether books are streamed instead of polled.
    #[serde(default)]
    pub enabled: bool,
    /// Feed URL.
    #[serde(default = "default_url")]
    pub url: String,
    /// Interval between keep-alive pings.
    #[serde(default = "default_ping_interval", with = "duration")]
    pub ping_interval: Duration,
    /// Base reconnect delay, multiplied by the attempt number.
    #[serde(default = "default_reconnect_delay", with = "duration")]
    pub reconnect_delay: Duration,
    /// Reconnect attempts before giving up.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_url(),
            ping_interval: default_ping_interval(),
            reconnect_delay: default_reconnect_delay(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
        }
    }
}

fn default_url() -> String {
    DEFAULT_WS_URL.to_string()
}

fn default_ping_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_reconnect_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_reconnect_attempts() -> u32 {
    5
}
