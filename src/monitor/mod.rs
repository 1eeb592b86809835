//! Market monitor.
//!
//! Polls the configured markets, derives [`MarketStats`] for each and persists
//! them. When a feed is attached, book updates are turned into snapshots too,
//! reusing the price history fetched by the last poll.

mod config;
mod error;
mod report;
mod stats;

pub use config::MonitorConfig;
pub use error::MonitorError;
pub use report::render_report;
pub use stats::Stats;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{Mutex, RwLock, mpsc, watch};
use tracing::{debug, info, warn};

use crate::analytics::AnalyticsParams;
use crate::clob::{FeedEvent, MarketDataSource};
use crate::config::{Config, MarketConfig};
use crate::domain::{MarketStats, OrderBook, PricePoint, Trade};
use crate::storage::SnapshotStorage;

/// Inputs fetched for an asset, reused by feed-driven snapshots.
#[derive(Debug, Clone, Default)]
struct MarketInputs {
    history: Vec<PricePoint>,
    trades: Vec<Trade>,
}

/// Monitor derives and records market stats for the configured tokens.
pub struct Monitor {
    cfg: Config,
    params: AnalyticsParams,
    source: Arc<dyn MarketDataSource>,
    storage: Option<Arc<dyn SnapshotStorage>>,

    // Runtime state
    version: String,
    started_at: Mutex<Option<Instant>>,
    running: Mutex<bool>,
    shutdown: watch::Sender<bool>,
    stats: Mutex<Stats>,

    inputs: RwLock<HashMap<String, MarketInputs>>,
    latest: RwLock<HashMap<String, MarketStats>>,
}

impl Monitor {
    /// Creates a new Monitor instance.
    pub fn new(
        cfg: MonitorConfig,
        source: Arc<dyn MarketDataSource>,
        storage: Option<Arc<dyn SnapshotStorage>>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);

        Monitor {
            params: cfg.app_config.analytics.params(),
            cfg: cfg.app_config,
            source,
            storage,
            version: cfg.version,
            started_at: Mutex::new(None),
            running: Mutex::new(false),
            shutdown,
            stats: Mutex::new(Stats::default()),
            inputs: RwLock::new(HashMap::new()),
            latest: RwLock::new(HashMap::new()),
        }
    }

    /// Starts polling and blocks until [`Monitor::stop`] is called.
    pub async fn start(&self) -> Result<(), MonitorError> {
        {
            let mut running = self.running.lock().await;
            if *running {
                return Err(MonitorError::AlreadyRunning);
            }
            *running = true;
        }

        {
            let mut started_at = self.started_at.lock().await;
            *started_at = Some(Instant::now());
        }
        self.shutdown.send_replace(false);

        info!(
            version = %self.version,
            source = %self.source.name(),
            markets = self.cfg.markets.len(),
            storage = self.storage.is_some(),
            "Starting market monitor"
        );

        self.run_poll_loop().await
    }

    /// Stops polling and feed consumption and closes storage.
    pub async fn stop(&self) -> Result<(), MonitorError> {
        {
            let mut running = self.running.lock().await;
            if !*running {
                return Ok(());
            }
            *running = false;
        }

        info!("Stopping monitor...");
        self.shutdown.send_replace(true);

        if let Some(ref storage) = self.storage {
            storage.close().await?;
        }

        let uptime = self.uptime().await;
        let stats = self.stats().await;
        info!(
            uptime = ?uptime,
            cycles = stats.cycles,
            snapshots_saved = stats.snapshots_saved,
            fetch_errors = stats.fetch_errors,
            "Monitor stopped"
        );

        Ok(())
    }

    /// Returns a copy of the current counters.
    pub async fn stats(&self) -> Stats {
        self.stats.lock().await.clone()
    }

    /// Returns true if the monitor is currently running.
    pub async fn is_running(&self) -> bool {
        *self.running.lock().await
    }

    /// Returns how long the monitor has been running.
    pub async fn uptime(&self) -> Duration {
        self.started_at
            .lock()
            .await
            .map(|s| s.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    /// Returns the most recent snapshot derived for an asset.
    pub async fn latest(&self, asset_id: &str) -> Option<MarketStats> {
        self.latest.read().await.get(asset_id).cloned()
    }

    /// Token ids of every configured market.
    pub fn token_ids(&self) -> Vec<String> {
        self.cfg.markets.iter().map(|m| m.token_id.clone()).collect()
    }

    /// Main polling loop.
    async fn run_poll_loop(&self) -> Result<(), MonitorError> {
        let poll_interval = self.cfg.analytics.poll_interval;
        let mut interval = tokio::time::interval(poll_interval);
        let mut shutdown = self.shutdown.subscribe();

        info!(poll_interval = ?poll_interval, "Starting poll loop");

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            tokio::select! {
                _ = interval.tick() => {
                    if !self.is_running().await {
                        break;
                    }
                    self.poll_once().await;
                }
                _ = shutdown.changed() => {}
            }
        }

        Ok(())
    }

    /// Runs one polling cycle over every configured market.
    /// Returns the snapshots derived; markets that failed are skipped.
    pub async fn poll_once(&self) -> Vec<MarketStats> {
        let cycle = {
            let mut stats = self.stats.lock().await;
            stats.cycles += 1;
            stats.cycles
        };

        debug!(cycle = cycle, markets = self.cfg.markets.len(), "Poll cycle running");

        let mut snapshots = Vec::with_capacity(self.cfg.markets.len());
        for market in &self.cfg.markets {
            match self.refresh_market(market).await {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => {
                    warn!(
                        market = %market.display_name(),
                        token_id = %market.token_id,
                        error = %e,
                        "Failed to refresh market"
                    );
                    self.stats.lock().await.fetch_errors += 1;
                }
            }
        }

        snapshots
    }

    /// Fetches inputs for one market and records a fresh snapshot.
    async fn refresh_market(&self, market: &MarketConfig) -> Result<MarketStats, MonitorError> {
        let analytics = &self.cfg.analytics;

        let order_book = self.source.get_order_book(&market.token_id).await?;
        let history = self
            .source
            .get_price_history(
                &market.token_id,
                &analytics.history_interval,
                analytics.history_fidelity,
            )
            .await?;

        let condition_id = market
            .market
            .as_deref()
            .unwrap_or(order_book.market.as_str());
        let trades = if condition_id.is_empty() {
            Vec::new()
        } else {
            self.source
                .get_market_trades(condition_id, analytics.trade_limit)
                .await?
        };

        let inputs = MarketInputs { history, trades };
        let snapshot = self.derive(&order_book, &inputs);
        self.inputs
            .write()
            .await
            .insert(market.token_id.clone(), inputs);

        self.record(&snapshot).await;
        Ok(snapshot)
    }

    /// Derives snapshots from feed events until the feed ends or the monitor stops.
    pub async fn consume_feed(&self, mut events: mpsc::UnboundedReceiver<FeedEvent>) {
        let mut shutdown = self.shutdown.subscribe();

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            let event = tokio::select! {
                event = events.recv() => event,
                _ = shutdown.changed() => continue,
            };

            let Some(event) = event else {
                debug!("Feed closed");
                break;
            };

            match event {
                FeedEvent::Book(order_book) => {
                    self.stats.lock().await.book_updates += 1;

                    let inputs = self
                        .inputs
                        .read()
                        .await
                        .get(&order_book.asset_id)
                        .cloned()
                        .unwrap_or_default();

                    let snapshot = self.derive(&order_book, &inputs);
                    self.record(&snapshot).await;
                }
                FeedEvent::Price { asset_id, data } => {
                    debug!(asset_id = %asset_id, data = %data, "Price update");
                }
                FeedEvent::Other { channel, .. } => {
                    debug!(channel = %channel, "Ignoring feed message");
                }
            }
        }
    }

    fn derive(&self, order_book: &OrderBook, inputs: &MarketInputs) -> MarketStats {
        MarketStats::derive(
            order_book,
            &inputs.history,
            &inputs.trades,
            &self.params,
            Utc::now().timestamp_millis(),
        )
    }

    /// Logs, caches and persists a snapshot.
    async fn record(&self, snapshot: &MarketStats) {
        self.stats.lock().await.snapshots_derived += 1;

        info!(
            asset_id = %snapshot.asset_id,
            spread = snapshot.spread,
            bid_depth = snapshot.bid_depth,
            ask_depth = snapshot.ask_depth,
            depth_skew = snapshot.depth_skew,
            price_change_24h = snapshot.price_change_24h,
            volume_24h = %snapshot.volume_24h,
            "Market stats"
        );

        self.latest
            .write()
            .await
            .insert(snapshot.asset_id.clone(), snapshot.clone());

        let Some(ref storage) = self.storage else {
            return;
        };

        match storage.save(snapshot).await {
            Ok(true) => self.stats.lock().await.snapshots_saved += 1,
            Ok(false) => {
                debug!(asset_id = %snapshot.asset_id, "Duplicate snapshot skipped");
                self.stats.lock().await.duplicate_snapshots += 1;
            }
            Err(e) => {
                warn!(asset_id = %snapshot.asset_id, error = %e, "Failed to save snapshot");
                self.stats.lock().await.storage_errors += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests;
