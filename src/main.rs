use polylens::clob::{ClobClient, FeedManager, MarketDataSource};
use polylens::config::Config;
use polylens::monitor::{Monitor, MonitorConfig, render_report};
use polylens::storage::{SnapshotStorage, SqliteStorage, SqliteStorageConfig};
use std::env;
use std::sync::Arc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_CONFIG_PATH: &str = "configs/config.yaml";

fn parse_config_path() -> String {
    for arg in env::args().skip(1) {
        if let Some(path) = arg.strip_prefix("--config=") {
            return path.to_string();
        }
    }
    DEFAULT_CONFIG_PATH.to_string()
}

fn init_tracing(log_level: Option<&str>) {
    let level = match log_level {
        Some("debug") => Level::DEBUG,
        Some("info") => Level::INFO,
        Some("warn") | Some("warning") => Level::WARN,
        Some("error") => Level::ERROR,
        Some("trace") => Level::TRACE,
        _ => Level::INFO,
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

#[tokio::main]
async fn main() {
    let config_path = parse_config_path();
    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return;
        }
    };

    init_tracing(config.app.log_level.as_deref());

    let client = match ClobClient::new(&config.clob) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to create CLOB client");
            return;
        }
    };

    info!(
        config = %config_path,
        env = %config.app.env,
        base_url = %config.clob.base_url,
        markets = config.markets.len(),
        "Configuration loaded"
    );

    let source: Arc<dyn MarketDataSource> = Arc::new(client);

    if env::args().any(|arg| arg == "--once") {
        print_reports(config, source).await;
        return;
    }

    let storage = open_storage(&config).await;
    run_monitor(config, source, storage).await;
}

fn monitor_config(config: Config) -> MonitorConfig {
    MonitorConfig {
        app_config: config,
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

/// Opens snapshot storage when enabled. Failures disable persistence.
async fn open_storage(config: &Config) -> Option<Arc<dyn SnapshotStorage>> {
    let section = config.enabled_storage()?;

    match SqliteStorage::new(SqliteStorageConfig::from(section)).await {
        Ok(storage) => Some(Arc::new(storage)),
        Err(e) => {
            warn!(error = %e, path = %section.path(), "Storage unavailable, snapshots will not be saved");
            None
        }
    }
}

/// Polls every market once and prints a report for each.
async fn print_reports(config: Config, source: Arc<dyn MarketDataSource>) {
    let markets = config.markets.clone();
    let monitor = Monitor::new(monitor_config(config), source, None);

    for snapshot in monitor.poll_once().await {
        let label = markets
            .iter()
            .find(|m| m.token_id == snapshot.asset_id)
            .map(|m| m.display_name())
            .unwrap_or(snapshot.asset_id.as_str());

        println!("{}\n", render_report(label, &snapshot));
    }

    let stats = monitor.stats().await;
    if stats.fetch_errors > 0 {
        warn!(failed = stats.fetch_errors, "Some markets could not be fetched");
    }
}

/// Runs the monitor until Ctrl+C, streaming book updates when the feed is enabled.
async fn run_monitor(
    config: Config,
    source: Arc<dyn MarketDataSource>,
    storage: Option<Arc<dyn SnapshotStorage>>,
) {
    let ws_config = config.websocket.clone();
    let monitor = Arc::new(Monitor::new(monitor_config(config), source, storage));

    let feed = if ws_config.enabled {
        let (feed, events_rx) = FeedManager::new(&ws_config);
        let feed = Arc::new(feed);

        for token_id in monitor.token_ids() {
            if let Err(e) = feed.subscribe_order_book(&token_id).await {
                warn!(token_id = %token_id, error = %e, "Failed to subscribe");
            }
        }

        // Spawn run which does: connect + resubscribe + ping_loop + read_loop
        let feed_clone = Arc::clone(&feed);
        tokio::spawn(async move {
            if let Err(e) = feed_clone.run().await {
                error!(error = %e, "WebSocket error");
            }
        });

        let consumer = Arc::clone(&monitor);
        tokio::spawn(async move { consumer.consume_feed(events_rx).await });

        Some(feed)
    } else {
        None
    };

    let runner = Arc::clone(&monitor);
    let handle = tokio::spawn(async move { runner.start().await });

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");

    if let Some(feed) = feed {
        feed.close().await;
    }

    if let Err(e) = monitor.stop().await {
        error!(error = %e, "Failed to stop monitor");
    }

    match handle.await {
        Ok(Err(e)) => error!(error = %e, "Monitor error"),
        Err(e) => error!(error = %e, "Monitor task failed"),
        Ok(Ok(())) => {}
    }
}
