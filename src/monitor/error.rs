//! Monitor error types.

use crate::clob::ClobError;
use crate::storage::StorageError;

/// Monitor error type.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("monitor is already running")]
    AlreadyRunning,
    #[error("market data error: {0}")]
    Source(#[from] ClobError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
