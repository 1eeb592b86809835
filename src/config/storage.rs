//! Storage configuration.

use serde::Deserialize;

/// Default database path.
const DEFAULT_PATH: &str = "snapshots.db";

/// Default connection pool size.
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Snapshot storage settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Whether derived snapshots are persisted.
    #[serde(default)]
    pub enabled: bool,
    /// Path to the SQLite database file.
    pub path: Option<String>,
    /// Maximum number of pooled connections.
    pub max_connections: Option<u32>,
}

impl StorageConfig {
    /// Database path, falling back to the default.
    pub fn path(&self) -> &str {
        self.path.as_deref().unwrap_or(DEFAULT_PATH)
    }

    /// Pool size, falling back to the default.
    pub fn max_connections(&self) -> u32 {
        self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS)
    }
}
