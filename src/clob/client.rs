//! HTTP client for the public CLOB REST API.

use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::{ClobError, MarketDataSource, Result};
use crate::config::ClobConfig;
use crate::domain::{OrderBook, PricePoint, Trade};

/// Length of the rate limit window.
const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// CLOB API error.
#[derive(Debug, Error)]
#[error("clob api error {code}: {message}")]
pub struct ApiError {
    pub code: i32,
    pub message: String,
}

struct RateLimitState {
    window_start: Instant,
}

/// HTTP client for the CLOB API.
/// Handles rate limiting and error mapping; all endpoints used are public.
pub struct ClobClient {
    base_url: String,
    rate_limit: i64,
    http_client: HttpClient,
    request_count: AtomicI64,
    rate_limit_state: Mutex<RateLimitState>,
}

impl ClobClient {
    /// Creates a new client from config.
    pub fn new(config: &ClobConfig) -> Result<Self> {
        let http_client = HttpClient::builder().timeout(config.timeout).build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rate_limit: config.rate_limit,
            http_client,
            request_count: AtomicI64::new(0),
            rate_limit_state: Mutex::new(RateLimitState {
                window_start: Instant::now(),
            }),
        })
    }

    /// Builds the request URL with sorted, percent-encoded query parameters.
    fn build_url(&self, endpoint: &str, params: &[(&str, String)]) -> String {
        let mut sorted: Vec<_> = params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let query: String = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        if query.is_empty() {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}{}?{}", self.base_url, endpoint, query)
        }
    }

    /// Sends a GET request and returns the raw response body.
    async fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Vec<u8>> {
        self.check_rate_limit()?;

        let url = self.build_url(endpoint, params);
        debug!(endpoint = %endpoint, url = %url, "sending request");

        let response = self.http_client.get(&url).send().await?;
        self.increment_request_count();

        let status = response.status();
        let body = response.bytes().await?;

        if status.is_client_error() || status.is_server_error() {
            return Err(parse_error_response(status, &body));
        }

        Ok(body.to_vec())
    }

    /// Verifies we haven't exceeded the rate limit.
    fn check_rate_limit(&self) -> Result<()> {
        let mut state = self
            .rate_limit_state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if state.window_start.elapsed() > RATE_LIMIT_WINDOW {
            self.request_count.store(0, Ordering::SeqCst);
            state.window_start = Instant::now();
        }

        let current = self.request_count.load(Ordering::SeqCst);
        if current >= self.rate_limit {
            return Err(ClobError::RateLimitExceeded {
                current,
                limit: self.rate_limit,
            });
        }

        Ok(())
    }

    /// Increments the request counter.
    fn increment_request_count(&self) {
        self.request_count.fetch_add(1, Ordering::SeqCst);
    }

    /// Returns the current request count in the window.
    pub fn request_count(&self) -> i64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Returns the maximum requests per minute.
    pub fn rate_limit(&self) -> i64 {
        self.rate_limit
    }
}

#[async_trait]
impl MarketDataSource for ClobClient {
    async fn get_order_book(&self, token_id: &str) -> Result<OrderBook> {
        let body = self
            .get("/book", &[("token_id", token_id.to_string())])
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get_price_history(
        &self,
        token_id: &str,
        interval: &str,
        fidelity: u32,
    ) -> Result<Vec<PricePoint>> {
        let body = self
            .get(
                "/prices-history",
                &[
                    ("market", token_id.to_string()),
                    ("interval", interval.to_string()),
                    ("fidelity", fidelity.to_string()),
                ],
            )
            .await?;
        parse_price_history(&body)
    }

    async fn get_market_trades(&self, market: &str, limit: u32) -> Result<Vec<Trade>> {
        let body = self
            .get(
                "/trades",
                &[("market", market.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn name(&self) -> &str {
        "clob"
    }
}

/// Parses a price history body, which is either a bare array of points or an
/// object wrapping them under `history`.
fn parse_price_history(body: &[u8]) -> Result<Vec<PricePoint>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum HistoryResponse {
        Points(Vec<PricePoint>),
        Wrapped { history: Vec<PricePoint> },
    }

    Ok(match serde_json::from_slice::<HistoryResponse>(body)? {
        HistoryResponse::Points(points) => points,
        HistoryResponse::Wrapped { history } => history,
    })
}

/// Creates a ClobError from an error response.
fn parse_error_response(status: StatusCode, body: &[u8]) -> ClobError {
    #[derive(Deserialize)]
    struct ErrorResponse {
        error: Option<String>,
        message: Option<String>,
    }

    let fallback = || String::from_utf8_lossy(body).to_string();
    let message = match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(resp) => resp.error.or(resp.message).unwrap_or_else(fallback),
        Err(_) => fallback(),
    };

    let api_err = ApiError {
        code: status.as_u16() as i32,
        message,
    };

    warn!(code = api_err.code, message = %api_err.message, "api error");

    ClobError::Api(api_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(rate_limit: i64) -> ClobClient {
        let config = ClobConfig {
            base_url: "https://clob.example.com/".to_string(),
            rate_limit,
            timeout: Duration::from_secs(1),
        };
        ClobClient::new(&config).unwrap()
    }

    #[test]
    fn test_build_url_sorts_and_encodes() {
        let c = client(10);
        let url = c.build_url(
            "/prices-history",
            &[
                ("market", "12 34".to_string()),
                ("interval", "1d".to_string()),
                ("fidelity", "60".to_string()),
            ],
        );
        assert_eq!(
            url,
            "https://clob.example.com/prices-history?fidelity=60&interval=1d&market=12%2034"
        );
    }

    #[test]
    fn test_build_url_without_params() {
        assert_eq!(client(10).build_url("/time", &[]), "https://clob.example.com/time");
    }

    #[test]
    fn test_rate_limit_exceeded() {
        let c = client(2);
        assert!(c.check_rate_limit().is_ok());
        c.increment_request_count();
        c.increment_request_count();

        match c.check_rate_limit() {
            Err(ClobError::RateLimitExceeded { current, limit }) => {
                assert_eq!(current, 2);
                assert_eq!(limit, 2);
            }
            other => panic!("expected rate limit error, got {:?}", other),
        }
        assert_eq!(c.request_count(), 2);
        assert_eq!(c.rate_limit(), 2);
    }

    #[test]
    fn test_parse_price_history_bare_array() {
        let body = br#"[{"t":1700000000,"p":0.41},{"t":1700000060,"p":0.43}]"#;
        let points = parse_price_history(body).unwrap();
        assert_eq!(points, vec![PricePoint::new(1_700_000_000, 0.41), PricePoint::new(1_700_000_060, 0.43)]);
    }

    #[test]
    fn test_parse_price_history_wrapped() {
        let body = br#"{"history":[{"t":1700000000,"p":0.5}]}"#;
        let points = parse_price_history(body).unwrap();
        assert_eq!(points, vec![PricePoint::new(1_700_000_000, 0.5)]);
    }

    #[test]
    fn test_parse_price_history_invalid() {
        assert!(matches!(parse_price_history(b"{}"), Err(ClobError::Json(_))));
    }

    #[test]
    fn test_parse_error_response_json() {
        let err = parse_error_response(StatusCode::NOT_FOUND, br#"{"error":"No orderbook exists"}"#);
        match err {
            ClobError::Api(api) => {
                assert_eq!(api.code, 404);
                assert_eq!(api.message, "No orderbook exists");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_response_plain_text() {
        let err = parse_error_response(StatusCode::BAD_GATEWAY, b"upstream down");
        match err {
            ClobError::Api(api) => {
                assert_eq!(api.code, 502);
                assert_eq!(api.message, "upstream down");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_order_book_wire_format() {
        let body = br#"{
            "market": "0xcond",
            "asset_id": "7132",
            "timestamp": "1700000000123",
            "hash": "deadbeef",
            "bids": [{"price": "0.45", "size": "1000"}],
            "asks": [{"price": "0.47", "size": "800"}]
        }"#;
        let book: OrderBook = serde_json::from_slice(body).unwrap();
        assert_eq!(book.asset_id, "7132");
        assert_eq!(book.timestamp, 1_700_000_000_123);
        assert_eq!(book.bids[0].price(), 0.45);
        assert_eq!(book.asks[0].size(), 800.0);
    }

    #[test]
    fn test_order_book_numeric_timestamp() {
        let body = br#"{"asset_id": "1", "timestamp": 42, "bids": [], "asks": []}"#;
        let book: OrderBook = serde_json::from_slice(body).unwrap();
        assert_eq!(book.timestamp, 42);
        assert_eq!(book.market, "");
    }

    #[test]
    fn test_trades_wire_format() {
        let body = br#"[{"id":"t1","market":"0xcond","asset_id":"7132","side":"SELL","price":"0.5","size":"10","match_time":"1700000000"}]"#;
        let trades: Vec<Trade> = serde_json::from_slice(body).unwrap();
        assert_eq!(trades[0].side, crate::domain::TradeSide::Sell);
        assert_eq!(trades[0].matched_at(), Some(1_700_000_000));
    }
}
