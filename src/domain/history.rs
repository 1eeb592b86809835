//! Price history and trade records.

use chrono::DateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One sample of a token's price history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Unix timestamp in seconds.
    pub t: i64,
    /// Price in `[0, 1]`.
    pub p: f64,
}

impl PricePoint {
    pub fn new(t: i64, p: f64) -> Self {
        Self { t, p }
    }
}

/// Side of a trade from the taker's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "BUY"),
            TradeSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Trade is a matched fill reported by the CLOB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    #[serde(default)]
    pub market: String,
    #[serde(default)]
    pub asset_id: String,
    pub side: TradeSide,
    pub price: String,
    pub size: String,
    /// Unix seconds, as a string.
    #[serde(default)]
    pub match_time: String,
    #[serde(default)]
    pub outcome: String,
}

impl Trade {
    /// Notional value (`size * price`), if both fields parse and the
    /// product fits in a `Decimal`.
    pub fn notional(&self) -> Option<Decimal> {
        let price = Decimal::from_str(self.price.trim()).ok()?;
        let size = Decimal::from_str(self.size.trim()).ok()?;
        price.checked_mul(size)
    }

    /// Match time in unix seconds. Accepts integer seconds or an RFC 3339
    /// date string.
    pub fn matched_at(&self) -> Option<i64> {
        let raw = self.match_time.trim();
        if let Ok(secs) = raw.parse::<i64>() {
            return Some(secs);
        }
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.timestamp())
    }
}
