//! Storage interfaces and implementations for persisting market snapshots.

mod sqlite;

pub use sqlite::{SqliteStorage, SqliteStorageConfig};

use crate::domain::MarketStats;
use async_trait::async_trait;

/// SnapshotStorage defines the interface for storing derived market stats.
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Save persists a snapshot.
    /// Returns true if the snapshot was saved (new), false if it already exists.
    async fn save(&self, stats: &MarketStats) -> Result<bool, StorageError>;

    /// Latest returns the most recent snapshot for an asset.
    async fn latest(&self, asset_id: &str) -> Result<Option<MarketStats>, StorageError>;

    /// History returns up to `limit` snapshots for an asset, newest first.
    async fn history(&self, asset_id: &str, limit: u32) -> Result<Vec<MarketStats>, StorageError>;

    /// Count returns the total number of stored snapshots.
    async fn count(&self) -> Result<i64, StorageError>;

    /// Close closes the storage connection.
    async fn close(&self) -> Result<(), StorageError>;
}

/// StorageError represents errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}
