//! Orderbook data structures.

use serde::{Deserialize, Deserializer, Serialize};

/// PriceLevel represents a single price level in the orderbook.
///
/// Price and size travel as decimal strings and are parsed on use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: String,
    pub size: String,
}

impl PriceLevel {
    pub fn new(price: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            price: price.into(),
            size: size.into(),
        }
    }

    /// Parsed price, `NaN` if the string is malformed.
    pub fn price(&self) -> f64 {
        parse_number(&self.price)
    }

    /// Parsed size, `NaN` if the string is malformed.
    pub fn size(&self) -> f64 {
        parse_number(&self.size)
    }
}

/// OrderBook is a snapshot of resting liquidity for a single outcome token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    /// Market (condition) identifier.
    #[serde(default)]
    pub market: String,
    /// Outcome token identifier.
    pub asset_id: String,
    /// Snapshot time in unix milliseconds, as reported by the CLOB.
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: i64,
    /// Opaque integrity tag, never validated.
    #[serde(default)]
    pub hash: String,
    /// Bid levels, best (highest) price first.
    #[serde(default)]
    pub bids: Vec<PriceLevel>,
    /// Ask levels, best (lowest) price first.
    #[serde(default)]
    pub asks: Vec<PriceLevel>,
}

impl OrderBook {
    /// Returns the best bid price level, if available.
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    /// Returns the best ask price level, if available.
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Returns the parsed best bid and best ask when both sides are populated.
    pub fn top_of_book(&self) -> Option<(f64, f64)> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid.price(), ask.price())),
            _ => None,
        }
    }
}

/// Parses a decimal string the way the wire format expects.
/// Malformed input becomes `NaN` and is left to propagate.
pub fn parse_number(s: &str) -> f64 {
    s.trim().parse::<f64>().unwrap_or(f64::NAN)
}

/// Accepts the timestamp as a JSON number or a numeric string.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Int(v)) => v,
        Some(Raw::Float(v)) => v as i64,
        Some(Raw::Text(s)) => s.trim().parse().unwrap_or(0),
        None => 0,
    })
}
