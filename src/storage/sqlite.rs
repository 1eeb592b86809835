//! SQLite implementation of SnapshotStorage.

use crate::config::StorageConfig;
use crate::domain::{LiquidityGap, LiquidityWalls, MarketStats};
use crate::storage::{SnapshotStorage, StorageError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// SqliteStorage implements SnapshotStorage using SQLite.
pub struct SqliteStorage {
    pool: Pool<Sqlite>,
}

/// SqliteStorageConfig holds SQLite storage configuration.
#[derive(Debug, Clone)]
pub struct SqliteStorageConfig {
    /// Path to the SQLite database file.
    pub path: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
}

impl Default for SqliteStorageConfig {
    fn default() -> Self {
        Self {
            path: "snapshots.db".to_string(),
            max_connections: 5,
        }
    }
}

impl From<&StorageConfig> for SqliteStorageConfig {
    fn from(config: &StorageConfig) -> Self {
        Self {
            path: config.path().to_string(),
            max_connections: config.max_connections(),
        }
    }
}

impl SqliteStorage {
    /// Creates a new SQLite storage instance.
    /// The database file is created if missing; its directory must exist.
    pub async fn new(config: SqliteStorageConfig) -> Result<Self, StorageError> {
        if let Some(parent) = Path::new(&config.path).parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(StorageError::NotFound(format!(
                    "database directory {}",
                    parent.display()
                )));
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        let storage = Self { pool };

        storage.migrate().await?;

        info!(path = %config.path, "SQLite storage initialized");
        Ok(storage)
    }

    /// Runs database migrations to create the schema.
    async fn migrate(&self) -> Result<(), StorageError> {
        // Metrics are stored as text so NaN and infinities survive.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS market_stats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                unique_hash TEXT NOT NULL UNIQUE,
                asset_id TEXT NOT NULL,
                market TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                bid_depth TEXT NOT NULL,
                ask_depth TEXT NOT NULL,
                depth_skew TEXT NOT NULL,
                spread TEXT NOT NULL,
                spread_percent TEXT NOT NULL,
                support TEXT,
                resistance TEXT,
                gap_from TEXT,
                gap_to TEXT,
                price_change_1h TEXT NOT NULL,
                price_change_6h TEXT NOT NULL,
                price_change_24h TEXT NOT NULL,
                price_slope TEXT NOT NULL,
                volatility TEXT NOT NULL,
                volume_24h TEXT NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_market_stats_asset_ts ON market_stats(asset_id, timestamp)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Generates a unique hash for detecting duplicate snapshots.
///
/// A snapshot is unique based on: asset_id, book timestamp, spread (4 decimals),
/// bid/ask depth (2 decimals) and 24h price change (4 decimals).
fn generate_unique_hash(stats: &MarketStats) -> String {
    let data = format!(
        "{}|{}|{:.4}|{:.2}|{:.2}|{:.4}",
        stats.asset_id,
        stats.timestamp,
        stats.spread,
        stats.bid_depth,
        stats.ask_depth,
        stats.price_change_24h
    );

    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    let hash = hasher.finalize();

    // Use first 16 bytes for shorter hash
    hex::encode(&hash[..16])
}

const SELECT_COLUMNS: &str = r#"
    SELECT asset_id, market, timestamp, bid_depth, ask_depth, depth_skew, spread,
        spread_percent, support, resistance, gap_from, gap_to, price_change_1h,
        price_change_6h, price_change_24h, price_slope, volatility, volume_24h
    FROM market_stats
"#;

#[async_trait]
impl SnapshotStorage for SqliteStorage {
    async fn save(&self, stats: &MarketStats) -> Result<bool, StorageError> {
        let unique_hash = generate_unique_hash(stats);
        let gap = stats.liquidity_gap;

        let result = sqlx::query(
            r#"
            INSERT INTO market_stats (
                unique_hash, asset_id, market, timestamp, bid_depth, ask_depth,
                depth_skew, spread, spread_percent, support, resistance, gap_from,
                gap_to, price_change_1h, price_change_6h, price_change_24h,
                price_slope, volatility, volume_24h
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
            ON CONFLICT(unique_hash) DO NOTHING
            "#,
        )
        .bind(&unique_hash)
        .bind(&stats.asset_id)
        .bind(&stats.market)
        .bind(stats.timestamp)
        .bind(stats.bid_depth.to_string())
        .bind(stats.ask_depth.to_string())
        .bind(stats.depth_skew.to_string())
        .bind(stats.spread.to_string())
        .bind(stats.spread_percent.to_string())
        .bind(stats.liquidity_walls.support.map(|p| p.to_string()))
        .bind(stats.liquidity_walls.resistance.map(|p| p.to_string()))
        .bind(gap.map(|g| g.from.to_string()))
        .bind(gap.map(|g| g.to.to_string()))
        .bind(stats.price_change_1h.to_string())
        .bind(stats.price_change_6h.to_string())
        .bind(stats.price_change_24h.to_string())
        .bind(stats.price_slope.to_string())
        .bind(stats.volatility.to_string())
        .bind(stats.volume_24h.to_string())
        .execute(&self.pool)
        .await?;

        let rows_affected = result.rows_affected();

        if rows_affected > 0 {
            debug!(
                asset_id = %stats.asset_id,
                timestamp = stats.timestamp,
                hash = %unique_hash,
                "Snapshot saved"
            );
        }

        Ok(rows_affected > 0)
    }

    async fn latest(&self, asset_id: &str) -> Result<Option<MarketStats>, StorageError> {
        let row = sqlx::query(&format!(
            "{} WHERE asset_id = ? ORDER BY timestamp DESC, id DESC LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(asset_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(parse_stats_row).transpose()
    }

    async fn history(&self, asset_id: &str, limit: u32) -> Result<Vec<MarketStats>, StorageError> {
        let rows = sqlx::query(&format!(
            "{} WHERE asset_id = ? ORDER BY timestamp DESC, id DESC LIMIT ?",
            SELECT_COLUMNS
        ))
        .bind(asset_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(parse_stats_row).collect()
    }

    async fn count(&self) -> Result<i64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM market_stats")
            .fetch_one(&self.pool)
            .await?;

        let count: i64 = row.try_get("count")?;
        Ok(count)
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.pool.close().await;
        Ok(())
    }
}

fn parse_f64(row: &SqliteRow, column: &str) -> Result<f64, StorageError> {
    let value: String = row.try_get(column)?;
    f64::from_str(&value)
        .map_err(|e| StorageError::InvalidData(format!("Invalid {}: {}", column, e)))
}

fn parse_optional_f64(row: &SqliteRow, column: &str) -> Result<Option<f64>, StorageError> {
    let value: Option<String> = row.try_get(column)?;
    value
        .map(|v| {
            f64::from_str(&v)
                .map_err(|e| StorageError::InvalidData(format!("Invalid {}: {}", column, e)))
        })
        .transpose()
}

/// Parses a snapshot from a database row.
fn parse_stats_row(row: &SqliteRow) -> Result<MarketStats, StorageError> {
    let volume_str: String = row.try_get("volume_24h")?;
    let volume_24h = Decimal::from_str(&volume_str)
        .map_err(|e| StorageError::InvalidData(format!("Invalid volume_24h: {}", e)))?;

    let liquidity_gap = match (
        parse_optional_f64(row, "gap_from")?,
        parse_optional_f64(row, "gap_to")?,
    ) {
        (Some(from), Some(to)) => Some(LiquidityGap { from, to }),
        (None, None) => None,
        _ => {
            return Err(StorageError::InvalidData(
                "gap_from and gap_to must both be set".to_string(),
            ));
        }
    };

    Ok(MarketStats {
        asset_id: row.try_get("asset_id")?,
        market: row.try_get("market")?,
        timestamp: row.try_get("timestamp")?,
        bid_depth: parse_f64(row, "bid_depth")?,
        ask_depth: parse_f64(row, "ask_depth")?,
        depth_skew: parse_f64(row, "depth_skew")?,
        spread: parse_f64(row, "spread")?,
        spread_percent: parse_f64(row, "spread_percent")?,
        liquidity_walls: LiquidityWalls {
            support: parse_optional_f64(row, "support")?,
            resistance: parse_optional_f64(row, "resistance")?,
        },
        liquidity_gap,
        price_change_1h: parse_f64(row, "price_change_1h")?,
        price_change_6h: parse_f64(row, "price_change_6h")?,
        price_change_24h: parse_f64(row, "price_change_24h")?,
        price_slope: parse_f64(row, "price_slope")?,
        volatility: parse_f64(row, "volatility")?,
        volume_24h,
    })
}
