//! Real-time order book and price feed over WebSocket.
//!
//! Channels are named `book:<token_id>` and `price:<token_id>`. Messages
//! arrive as `{"channel": ..., "data": ...}` and are forwarded as
//! [`FeedEvent`]s on an unbounded channel.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};

use crate::config::WebSocketConfig;
use crate::domain::OrderBook;

const BOOK_PREFIX: &str = "book:";
const PRICE_PREFIX: &str = "price:";

/// Type alias for WebSocket connection.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, WsMessage>;
type WsSource = SplitStream<WsStream>;

/// WebSocket error type.
type WsError = tokio_tungstenite::tungstenite::Error;

/// An update received from the feed.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Full order book snapshot for a token.
    Book(OrderBook),
    /// Price update for a token; payload is passed through untouched.
    Price { asset_id: String, data: Value },
    /// Message on a channel this client does not interpret.
    Other { channel: String, data: Value },
}

/// Channel name for order book updates of a token.
pub fn book_channel(token_id: &str) -> String {
    format!("{}{}", BOOK_PREFIX, token_id)
}

/// Channel name for price updates of a token.
pub fn price_channel(token_id: &str) -> String {
    format!("{}{}", PRICE_PREFIX, token_id)
}

/// Delay before reconnect attempt `attempt` (1-based): grows linearly.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(attempt)
}

/// Reference-counted channel subscriptions.
///
/// The server only needs to hear about a channel on its first subscriber and
/// after its last one leaves.
#[derive(Debug, Default)]
pub struct Subscriptions {
    channels: HashMap<String, usize>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber. Returns true if the channel is new.
    pub fn add(&mut self, channel: &str) -> bool {
        let count = self.channels.entry(channel.to_string()).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Drops a subscriber. Returns true if that was the last one.
    pub fn remove(&mut self, channel: &str) -> bool {
        let Some(count) = self.channels.get_mut(channel) else {
            return false;
        };

        *count -= 1;
        if *count == 0 {
            self.channels.remove(channel);
            return true;
        }
        false
    }

    /// Number of subscribers on a channel.
    pub fn subscribers(&self, channel: &str) -> usize {
        self.channels.get(channel).copied().unwrap_or(0)
    }

    /// Active channels, sorted.
    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.channels.keys().cloned().collect();
        channels.sort();
        channels
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn clear(&mut self) {
        self.channels.clear();
    }
}

/// Connection settings used by the feed.
struct FeedConfig {
    url: String,
    ping_interval: Duration,
    reconnect_delay: Duration,
    max_reconnect_attempts: u32,
}

impl From<&WebSocketConfig> for FeedConfig {
    fn from(config: &WebSocketConfig) -> Self {
        Self {
            url: config.url.clone(),
            ping_interval: config.ping_interval,
            reconnect_delay: config.reconnect_delay,
            max_reconnect_attempts: config.max_reconnect_attempts,
        }
    }
}

/// FeedManager owns the WebSocket connection and its subscriptions.
pub struct FeedManager {
    config: FeedConfig,
    sink: Arc<Mutex<Option<WsSink>>>,
    subscriptions: Mutex<Subscriptions>,
    events_tx: mpsc::UnboundedSender<FeedEvent>,
    closed: Arc<AtomicBool>,
}

impl FeedManager {
    /// Creates a new feed manager and the receiver for its events.
    pub fn new(config: &WebSocketConfig) -> (Self, mpsc::UnboundedReceiver<FeedEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let manager = Self {
            config: FeedConfig::from(config),
            sink: Arc::new(Mutex::new(None)),
            subscriptions: Mutex::new(Subscriptions::new()),
            events_tx,
            closed: Arc::new(AtomicBool::new(false)),
        };

        (manager, events_rx)
    }

    /// Returns true if the manager is closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Returns the channels currently subscribed.
    pub async fn subscribed_channels(&self) -> Vec<String> {
        self.subscriptions.lock().await.channels()
    }

    /// Subscribes to order book snapshots for a token.
    pub async fn subscribe_order_book(&self, token_id: &str) -> Result<(), WsError> {
        self.subscribe_channel(&book_channel(token_id)).await
    }

    /// Releases one order book subscription for a token.
    pub async fn unsubscribe_order_book(&self, token_id: &str) -> Result<(), WsError> {
        self.unsubscribe_channel(&book_channel(token_id)).await
    }

    /// Subscribes to price updates for a token.
    pub async fn subscribe_price(&self, token_id: &str) -> Result<(), WsError> {
        self.subscribe_channel(&price_channel(token_id)).await
    }

    /// Releases one price subscription for a token.
    pub async fn unsubscribe_price(&self, token_id: &str) -> Result<(), WsError> {
        self.unsubscribe_channel(&price_channel(token_id)).await
    }

    async fn subscribe_channel(&self, channel: &str) -> Result<(), WsError> {
        let is_new = self.subscriptions.lock().await.add(channel);
        if is_new {
            self.send_json(json!({"type": "subscribe", "channel": channel}))
                .await?;
        }
        Ok(())
    }

    async fn unsubscribe_channel(&self, channel: &str) -> Result<(), WsError> {
        let was_last = self.subscriptions.lock().await.remove(channel);
        if was_last {
            self.send_json(json!({"type": "unsubscribe", "channel": channel}))
                .await?;
        }
        Ok(())
    }

    /// Sends a JSON message if connected. Messages sent while disconnected
    /// are dropped; subscriptions are replayed on the next connect.
    async fn send_json(&self, message: Value) -> Result<(), WsError> {
        let mut guard = self.sink.lock().await;
        let Some(sink) = guard.as_mut() else {
            debug!(message = %message, "not connected, message deferred");
            return Ok(());
        };

        sink.send(WsMessage::Text(message.to_string().into()))
            .await
            .map_err(|e| {
                error!(error = %e, "failed to send message");
                e
            })
    }

    /// Connects and replays every known subscription.
    async fn connect(&self) -> Result<WsSource, WsError> {
        info!(url = %self.config.url, "connecting to websocket");

        let (ws_stream, _response) = connect_async(&self.config.url).await.map_err(|e| {
            error!(error = %e, url = %self.config.url, "failed to connect to websocket");
            e
        })?;

        let (sink, stream) = ws_stream.split();
        *self.sink.lock().await = Some(sink);

        let channels = self.subscribed_channels().await;
        for channel in &channels {
            self.send_json(json!({"type": "subscribe", "channel": channel}))
                .await?;
        }

        info!(channels = channels.len(), "websocket connected");

        Ok(stream)
    }

    /// Closes the connection and forgets all subscriptions.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.subscriptions.lock().await.clear();

        let mut guard = self.sink.lock().await;
        if let Some(mut sink) = guard.take() {
            if let Err(e) = sink.close().await {
                error!(error = %e, "failed to close websocket");
            }
        }

        info!("websocket closed");
    }

    /// Retries the connection with linear backoff.
    /// Returns None once attempts are exhausted or the manager is closed.
    async fn reconnect(&self) -> Option<WsSource> {
        {
            let mut guard = self.sink.lock().await;
            if let Some(mut sink) = guard.take() {
                let _ = sink.close().await;
            }
        }

        for attempt in 1..=self.config.max_reconnect_attempts {
            if self.is_closed() {
                return None;
            }

            let delay = backoff_delay(self.config.reconnect_delay, attempt);
            info!(attempt = attempt, delay = ?delay, "reconnecting");
            tokio::time::sleep(delay).await;

            if self.is_closed() {
                return None;
            }

            match self.connect().await {
                Ok(stream) => return Some(stream),
                Err(e) => warn!(attempt = attempt, error = %e, "reconnect attempt failed"),
            }
        }

        error!(
            attempts = self.config.max_reconnect_attempts,
            "max reconnect attempts reached"
        );
        None
    }

    /// Connects, keeps the connection alive and forwards events until closed
    /// or reconnection gives up.
    pub async fn run(&self) -> Result<(), WsError> {
        let stream = match self.connect().await {
            Ok(stream) => stream,
            Err(e) => match self.reconnect().await {
                Some(stream) => stream,
                None => return Err(e),
            },
        };

        let ping_handle = self.spawn_ping_loop();
        self.read_loop(stream).await;
        ping_handle.abort();

        Ok(())
    }

    /// Reads messages and forwards events, reconnecting on recoverable errors.
    async fn read_loop(&self, mut stream: WsSource) {
        loop {
            if self.is_closed() {
                break;
            }

            match stream.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    if let Some(event) = parse_message(&text) {
                        if self.events_tx.send(event).is_err() {
                            warn!("feed channel closed");
                            break;
                        }
                    }
                }
                Some(Ok(WsMessage::Close(_))) => {
                    info!("websocket closed by server");
                    match self.reconnect().await {
                        Some(new_stream) => stream = new_stream,
                        None => break,
                    }
                }
                Some(Ok(_)) => {
                    // Ping, Pong, Binary
                }
                Some(Err(e)) => {
                    if should_reconnect(&e) {
                        error!(error = %e, "websocket error, attempting reconnect");
                        match self.reconnect().await {
                            Some(new_stream) => stream = new_stream,
                            None => break,
                        }
                    } else {
                        error!(error = %e, "websocket error (non-recoverable)");
                        break;
                    }
                }
                None => {
                    info!("websocket stream ended");
                    match self.reconnect().await {
                        Some(new_stream) => stream = new_stream,
                        None => break,
                    }
                }
            }
        }

        let mut guard = self.sink.lock().await;
        if let Some(mut sink) = guard.take() {
            let _ = sink.close().await;
        }
    }

    /// Spawns the keep-alive ping loop as a background task.
    fn spawn_ping_loop(&self) -> tokio::task::JoinHandle<()> {
        let ping_interval = self.config.ping_interval;
        let sink = Arc::clone(&self.sink);
        let closed = Arc::clone(&self.closed);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(ping_interval);

            loop {
                interval.tick().await;

                if closed.load(Ordering::SeqCst) {
                    break;
                }

                let mut guard = sink.lock().await;
                // Disconnected; the next tick may find a new sink.
                let Some(sink_ref) = guard.as_mut() else {
                    continue;
                };

                if let Err(e) = sink_ref.send(WsMessage::Ping(Vec::<u8>::new().into())).await {
                    warn!(error = %e, "ping failed");
                } else {
                    debug!("ping sent");
                }
            }
        })
    }
}

/// Returns true if the error warrants a reconnection attempt.
/// A peer that drops the socket without a close frame counts as recoverable.
fn should_reconnect(error: &WsError) -> bool {
    use tokio_tungstenite::tungstenite::Error;
    use tokio_tungstenite::tungstenite::error::ProtocolError;

    match error {
        Error::Protocol(ProtocolError::ResetWithoutClosingHandshake) => true,
        Error::ConnectionClosed | Error::AlreadyClosed | Error::Io(_) | Error::Tls(_) => true,
        Error::Http(response) => response.status().is_server_error(),
        _ => false,
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    channel: Option<String>,
    #[serde(default)]
    data: Value,
}

/// Parses a feed message into an event.
/// Returns None for malformed JSON, messages without a channel, and book
/// payloads that do not decode.
fn parse_message(text: &str) -> Option<FeedEvent> {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "failed to parse feed message");
            return None;
        }
    };

    let Some(channel) = envelope.channel else {
        debug!("message without channel");
        return None;
    };

    if channel.starts_with(BOOK_PREFIX) {
        return match serde_json::from_value::<OrderBook>(envelope.data) {
            Ok(book) => Some(FeedEvent::Book(book)),
            Err(e) => {
                warn!(channel = %channel, error = %e, "invalid book payload");
                None
            }
        };
    }

    if let Some(asset_id) = channel.strip_prefix(PRICE_PREFIX) {
        return Some(FeedEvent::Price {
            asset_id: asset_id.to_string(),
            data: envelope.data,
        });
    }

    Some(FeedEvent::Other {
        channel,
        data: envelope.data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names() {
        assert_eq!(book_channel("123"), "book:123");
        assert_eq!(price_channel("123"), "price:123");
    }

    #[test]
    fn test_backoff_is_linear() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 3), Duration::from_secs(3));
        assert_eq!(backoff_delay(Duration::from_millis(250), 4), Duration::from_secs(1));
    }

    #[test]
    fn test_subscriptions_reference_counted() {
        let mut subs = Subscriptions::new();

        assert!(subs.add("book:1"));
        assert!(!subs.add("book:1"));
        assert_eq!(subs.subscribers("book:1"), 2);

        assert!(!subs.remove("book:1"));
        assert!(subs.remove("book:1"));
        assert!(subs.is_empty());
    }

    #[test]
    fn test_subscriptions_remove_unknown() {
        let mut subs = Subscriptions::new();
        assert!(!subs.remove("price:9"));
        assert_eq!(subs.subscribers("price:9"), 0);
    }

    #[test]
    fn test_subscriptions_sorted_channels() {
        let mut subs = Subscriptions::new();
        subs.add("price:2");
        subs.add("book:2");
        subs.add("book:1");
        assert_eq!(subs.channels(), vec!["book:1", "book:2", "price:2"]);

        subs.clear();
        assert!(subs.channels().is_empty());
    }

    #[test]
    fn test_parse_book_message() {
        let text = r#"{"channel":"book:42","data":{"market":"0xm","asset_id":"42","timestamp":1,"hash":"h","bids":[{"price":"0.4","size":"10"}],"asks":[]}}"#;
        match parse_message(text) {
            Some(FeedEvent::Book(book)) => {
                assert_eq!(book.asset_id, "42");
                assert_eq!(book.bids.len(), 1);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_parse_price_message() {
        let text = r#"{"channel":"price:42","data":{"price":"0.41"}}"#;
        assert_eq!(
            parse_message(text),
            Some(FeedEvent::Price {
                asset_id: "42".to_string(),
                data: json!({"price": "0.41"}),
            })
        );
    }

    #[test]
    fn test_parse_other_message() {
        let text = r#"{"channel":"trades:42","data":[1,2]}"#;
        assert_eq!(
            parse_message(text),
            Some(FeedEvent::Other {
                channel: "trades:42".to_string(),
                data: json!([1, 2]),
            })
        );
    }

    #[test]
    fn test_parse_ignored_messages() {
        assert_eq!(parse_message("not json"), None);
        assert_eq!(parse_message(r#"{"type":"pong"}"#), None);
        assert_eq!(parse_message(r#"{"channel":"book:1","data":"oops"}"#), None);
    }

    #[tokio::test]
    async fn test_subscribe_while_disconnected_is_recorded() {
        let (feed, _rx) = FeedManager::new(&WebSocketConfig::default());

        feed.subscribe_order_book("1").await.unwrap();
        feed.subscribe_order_book("1").await.unwrap();
        feed.subscribe_price("2").await.unwrap();
        assert_eq!(feed.subscribed_channels().await, vec!["book:1", "price:2"]);

        feed.unsubscribe_order_book("1").await.unwrap();
        assert_eq!(feed.subscribed_channels().await, vec!["book:1", "price:2"]);

        feed.unsubscribe_order_book("1").await.unwrap();
        feed.unsubscribe_price("2").await.unwrap();
        assert!(feed.subscribed_channels().await.is_empty());
    }

    #[tokio::test]
    async fn test_close_clears_subscriptions() {
        let (feed, _rx) = FeedManager::new(&WebSocketConfig::default());
        feed.subscribe_order_book("1").await.unwrap();

        feed.close().await;
        assert!(feed.is_closed());
        assert!(feed.subscribed_channels().await.is_empty());

        // Closing twice is a no-op.
        feed.close().await;
    }
}
