//! Tests for monitor module.

use super::*;
use crate::clob::{ApiError, ClobError};
use crate::domain::{PriceLevel, TradeSide};
use crate::storage::StorageError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

const EPS: f64 = 1e-9;

// ==================== Stubs ====================

struct StubSource {
    books: HashMap<String, OrderBook>,
    history: Vec<PricePoint>,
    trades: Vec<Trade>,
    trade_calls: AtomicUsize,
}

#[async_trait]
impl MarketDataSource for StubSource {
    async fn get_order_book(&self, token_id: &str) -> crate::clob::Result<OrderBook> {
        self.books.get(token_id).cloned().ok_or_else(|| {
            ClobError::Api(ApiError {
                code: 404,
                message: "No orderbook exists".to_string(),
            })
        })
    }

    async fn get_price_history(
        &self,
        _token_id: &str,
        _interval: &str,
        _fidelity: u32,
    ) -> crate::clob::Result<Vec<PricePoint>> {
        Ok(self.history.clone())
    }

    async fn get_market_trades(&self, _market: &str, _limit: u32) -> crate::clob::Result<Vec<Trade>> {
        self.trade_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.trades.clone())
    }

    fn name(&self) -> &str {
        "stub"
    }
}

#[derive(Default)]
struct MemoryStorage {
    seen: std::sync::Mutex<HashSet<(String, i64)>>,
    closed: std::sync::atomic::AtomicBool,
}

#[async_trait]
impl SnapshotStorage for MemoryStorage {
    async fn save(&self, stats: &MarketStats) -> Result<bool, StorageError> {
        let mut seen = self.seen.lock().unwrap();
        Ok(seen.insert((stats.asset_id.clone(), stats.timestamp)))
    }

    async fn latest(&self, _asset_id: &str) -> Result<Option<MarketStats>, StorageError> {
        Ok(None)
    }

    async fn history(&self, _asset_id: &str, _limit: u32) -> Result<Vec<MarketStats>, StorageError> {
        Ok(Vec::new())
    }

    async fn count(&self) -> Result<i64, StorageError> {
        Ok(self.seen.lock().unwrap().len() as i64)
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// ==================== Fixtures ====================

fn config(yaml_markets: &str) -> Config {
    let yaml = format!(
        r#"
app:
  name: test
analytics:
  liquidity_threshold: 900
  poll_interval: 50ms
markets:
{}
"#,
        yaml_markets
    );
    serde_yaml::from_str(&yaml).unwrap()
}

fn book(asset_id: &str, timestamp: i64) -> OrderBook {
    OrderBook {
        market: "0xcond".to_string(),
        asset_id: asset_id.to_string(),
        timestamp,
        hash: String::new(),
        bids: vec![PriceLevel::new("0.45", "1000"), PriceLevel::new("0.44", "500")],
        asks: vec![PriceLevel::new("0.47", "800"), PriceLevel::new("0.48", "300")],
    }
}

fn recent_trade(size: &str) -> Trade {
    Trade {
        id: "t1".to_string(),
        market: "0xcond".to_string(),
        asset_id: "1".to_string(),
        side: TradeSide::Buy,
        price: "0.5".to_string(),
        size: size.to_string(),
        match_time: (Utc::now().timestamp() - 60).to_string(),
        outcome: "Yes".to_string(),
    }
}

fn source() -> StubSource {
    let mut books = HashMap::new();
    books.insert("1".to_string(), book("1", 100));

    StubSource {
        books,
        history: vec![PricePoint::new(1, 0.40), PricePoint::new(2, 0.44)],
        trades: vec![recent_trade("100"), recent_trade("20")],
        trade_calls: AtomicUsize::new(0),
    }
}

fn monitor(
    cfg: Config,
    source: Arc<StubSource>,
    storage: Option<Arc<MemoryStorage>>,
) -> Monitor {
    Monitor::new(
        MonitorConfig {
            app_config: cfg,
            version: "test".to_string(),
        },
        source,
        storage.map(|s| s as Arc<dyn SnapshotStorage>),
    )
}

// ==================== Polling ====================

#[tokio::test]
async fn test_poll_once_derives_stats() {
    let m = monitor(config("  - token_id: \"1\""), Arc::new(source()), None);

    let snapshots = m.poll_once().await;
    assert_eq!(snapshots.len(), 1);

    let s = &snapshots[0];
    assert_eq!(s.asset_id, "1");
    assert!((s.spread - 0.02).abs() < EPS);
    assert_eq!(s.bid_depth, 1500.0);
    assert_eq!(s.ask_depth, 1100.0);
    assert_eq!(s.liquidity_walls.support, Some(0.45));
    assert_eq!(s.liquidity_walls.resistance, None);
    assert!((s.price_slope - 0.04).abs() < EPS);
    assert_eq!(s.volume_24h, Decimal::new(60, 0));

    assert_eq!(m.latest("1").await.as_ref(), Some(s));

    let stats = m.stats().await;
    assert_eq!(stats.cycles, 1);
    assert_eq!(stats.snapshots_derived, 1);
    assert_eq!(stats.fetch_errors, 0);
}

#[tokio::test]
async fn test_poll_once_skips_failing_market() {
    let cfg = config("  - token_id: \"1\"\n  - token_id: \"missing\"");
    let m = monitor(cfg, Arc::new(source()), None);

    let snapshots = m.poll_once().await;
    assert_eq!(snapshots.len(), 1);
    assert_eq!(m.token_ids(), vec!["1", "missing"]);

    let stats = m.stats().await;
    assert_eq!(stats.fetch_errors, 1);
    assert_eq!(stats.snapshots_derived, 1);
}

#[tokio::test]
async fn test_poll_once_uses_configured_market_for_trades() {
    let src = Arc::new(source());
    let m = monitor(
        config("  - token_id: \"1\"\n    market: \"0xother\""),
        Arc::clone(&src),
        None,
    );

    m.poll_once().await;
    assert_eq!(src.trade_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_poll_once_without_market_id_skips_trades() {
    let mut src = source();
    src.books.get_mut("1").unwrap().market = String::new();
    let src = Arc::new(src);
    let m = monitor(config("  - token_id: \"1\""), Arc::clone(&src), None);

    let snapshots = m.poll_once().await;
    assert_eq!(src.trade_calls.load(Ordering::SeqCst), 0);
    assert_eq!(snapshots[0].volume_24h, Decimal::ZERO);
}

#[tokio::test]
async fn test_duplicate_snapshots_not_counted_as_saved() {
    let storage = Arc::new(MemoryStorage::default());
    let m = monitor(
        config("  - token_id: \"1\""),
        Arc::new(source()),
        Some(Arc::clone(&storage)),
    );

    m.poll_once().await;
    m.poll_once().await;

    let stats = m.stats().await;
    assert_eq!(stats.cycles, 2);
    assert_eq!(stats.snapshots_derived, 2);
    assert_eq!(stats.snapshots_saved, 1);
    assert_eq!(stats.duplicate_snapshots, 1);
    assert_eq!(storage.count().await.unwrap(), 1);
}

// ==================== Feed ====================

#[tokio::test]
async fn test_consume_feed_reuses_polled_history() {
    let m = monitor(config("  - token_id: \"1\""), Arc::new(source()), None);
    m.poll_once().await;

    let (tx, rx) = mpsc::unbounded_channel();
    let mut update = book("1", 200);
    update.bids = vec![PriceLevel::new("0.46", "10")];
    tx.send(FeedEvent::Book(update)).unwrap();
    tx.send(FeedEvent::Other {
        channel: "status".to_string(),
        data: serde_json::Value::Null,
    })
    .unwrap();
    drop(tx);

    m.consume_feed(rx).await;

    let latest = m.latest("1").await.unwrap();
    assert_eq!(latest.timestamp, 200);
    assert!((latest.spread - 0.01).abs() < EPS);
    assert!((latest.price_slope - 0.04).abs() < EPS);

    let stats = m.stats().await;
    assert_eq!(stats.book_updates, 1);
    assert_eq!(stats.snapshots_derived, 2);
}

#[tokio::test]
async fn test_consume_feed_unknown_asset_has_no_history() {
    let m = monitor(config("  - token_id: \"1\""), Arc::new(source()), None);

    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(FeedEvent::Book(book("9", 1))).unwrap();
    drop(tx);

    m.consume_feed(rx).await;

    let latest = m.latest("9").await.unwrap();
    assert_eq!(latest.price_slope, 0.0);
    assert_eq!(latest.volume_24h, Decimal::ZERO);
}

// ==================== Lifecycle ====================

#[tokio::test]
async fn test_start_twice_and_stop() {
    let storage = Arc::new(MemoryStorage::default());
    let m = Arc::new(monitor(
        config("  - token_id: \"1\""),
        Arc::new(source()),
        Some(Arc::clone(&storage)),
    ));

    let runner = Arc::clone(&m);
    let handle = tokio::spawn(async move { runner.start().await });

    while !m.is_running().await {
        tokio::task::yield_now().await;
    }

    assert!(matches!(m.start().await, Err(MonitorError::AlreadyRunning)));

    m.stop().await.unwrap();
    handle.await.unwrap().unwrap();

    assert!(!m.is_running().await);
    assert!(storage.closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_stop_when_not_running() {
    let m = monitor(config("  - token_id: \"1\""), Arc::new(source()), None);
    assert!(m.stop().await.is_ok());
    assert_eq!(m.uptime().await, Duration::ZERO);
}
