//! Order book analytics for Polymarket outcome tokens.
//!
//! The [`analytics`] module holds the pure metric functions; [`clob`],
//! [`storage`] and [`monitor`] wire them to live data.

pub mod analytics;
pub mod clob;
pub mod config;
pub mod domain;
pub mod format;
pub mod monitor;
pub mod storage;
