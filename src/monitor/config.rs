//! Monitor configuration.

use crate::config::Config;

/// Monitor configuration options.
pub struct MonitorConfig {
    /// Application configuration.
    pub app_config: Config,
    /// Application version, reported at startup.
    pub version: String,
}
