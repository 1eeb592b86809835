//! Polymarket CLOB integration: REST client and WebSocket feed.

mod client;
mod feed;

pub use client::{ApiError, ClobClient};
pub use feed::{FeedEvent, FeedManager, Subscriptions, backoff_delay, book_channel, price_channel};

use crate::domain::{OrderBook, PricePoint, Trade};
use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by market data sources.
#[derive(Debug, Error)]
pub enum ClobError {
    #[error("rate limit exceeded: {current}/{limit} per minute")]
    RateLimitExceeded { current: i64, limit: i64 },

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Result type for market data operations.
pub type Result<T> = std::result::Result<T, ClobError>;

/// MarketDataSource supplies order books, price history and trades.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetches the current order book for an outcome token.
    async fn get_order_book(&self, token_id: &str) -> Result<OrderBook>;

    /// Fetches order books for several tokens, in request order.
    /// Fails on the first token that cannot be fetched.
    async fn get_order_books(&self, token_ids: &[String]) -> Result<Vec<OrderBook>> {
        let mut books = Vec::with_capacity(token_ids.len());
        for token_id in token_ids {
            books.push(self.get_order_book(token_id).await?);
        }
        Ok(books)
    }

    /// Fetches price history for a token.
    /// `interval` is the lookback window ("1h", "1d", "1w", "max"),
    /// `fidelity` the resolution in minutes.
    async fn get_price_history(
        &self,
        token_id: &str,
        interval: &str,
        fidelity: u32,
    ) -> Result<Vec<PricePoint>>;

    /// Fetches the most recent trades of a market.
    async fn get_market_trades(&self, market: &str, limit: u32) -> Result<Vec<Trade>>;

    /// Identifier of this source, used in logs.
    fn name(&self) -> &str;
}
