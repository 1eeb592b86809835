//! Runtime counters for the monitor.

/// Runtime counters for the monitor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    pub cycles: u64,
    pub snapshots_derived: u64,
    pub snapshots_saved: u64,
    pub duplicate_snapshots: u64,
    pub fetch_errors: u64,
    pub storage_errors: u64,
    pub book_updates: u64,
}
