/// Binance combined trade stream client for real-time data
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::StreamExt;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, error, info, warn};

use crate::broker::messages::{combined_stream_url, decode_message};
use crate::error::{BarError, Result};
use crate::types::FeedEvent;

pub const BINANCE_WS_URL: &str = "wss://stream.binance.com:9443";

/// Upper bound on TCP connect plus TLS and websocket handshakes
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport-level subscription control used by the health monitor.
///
/// Both calls are idempotent: starting while subscribed or stopping while
/// stopped does nothing.
pub trait SubscriptionControl: Send + Sync {
    fn start_subscription<'a>(&'a self, symbols: &'a [String]) -> BoxFuture<'a, Result<()>>;

    fn stop_subscription(&self) -> BoxFuture<'_, Result<()>>;
}

pub struct BinanceTradeStream {
    base_url: String,
    connect_timeout: Duration,
    tx: mpsc::UnboundedSender<FeedEvent>,
    reader: Mutex<Option<JoinHandle<()>>>,
    subscribed: Arc<RwLock<Vec<String>>>,
}

impl BinanceTradeStream {
    /// Create the client and the receiver its events are delivered to
    pub fn new(base_url: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<FeedEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let stream = BinanceTradeStream {
            base_url: base_url.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            tx,
            reader: Mutex::new(None),
            subscribed: Arc::new(RwLock::new(Vec::new())),
        };

        (stream, rx)
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Check if a reader task is live
    pub async fn is_subscribed(&self) -> bool {
        let reader = self.reader.lock().await;
        reader.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    pub async fn subscribed_symbols(&self) -> Vec<String> {
        self.subscribed.read().await.clone()
    }

    async fn connect(&self, symbols: &[String]) -> Result<()> {
        let mut reader = self.reader.lock().await;

        if let Some(handle) = reader.as_ref() {
            if !handle.is_finished() {
                debug!("Already subscribed - start ignored");
                return Ok(());
            }
        }

        let url = combined_stream_url(&self.base_url, symbols);
        info!("🔌 Connecting to {}", url);

        let (mut ws_stream, _) = tokio::time::timeout(self.connect_timeout, connect_async(&url))
            .await
            .map_err(|_| {
                BarError::WebSocketError(format!("Connection timed out after {:?}", self.connect_timeout))
            })?
            .map_err(|e| BarError::WebSocketError(format!("Connection failed: {}", e)))?;

        info!("✅ WebSocket connected - {} trade streams", symbols.len());

        let tx = self.tx.clone();
        *reader = Some(tokio::spawn(async move {
            while let Some(msg) = ws_stream.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if tx.send(decode_message(&text)).is_err() {
                            debug!("Feed receiver dropped - reader exiting");
                            return;
                        }
                    }
                    Ok(Message::Ping(_)) => {
                        debug!("Received ping");
                    }
                    Ok(Message::Close(frame)) => {
                        warn!("WebSocket closed by server: {:?}", frame);
                        break;
                    }
                    Ok(other) => {
                        debug!("Ignoring non-text frame: {:?}", other);
                    }
                    Err(e) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                }
            }

            // An unrequested end of stream needs a resubscribe
            let _ = tx.send(FeedEvent::ErrorEnvelope("stream ended".to_string()));
            warn!("WebSocket reader task ended");
        }));

        let mut subscribed = self.subscribed.write().await;
        *subscribed = symbols.to_vec();

        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let mut reader = self.reader.lock().await;

        match reader.take() {
            Some(handle) => {
                handle.abort();
                self.subscribed.write().await.clear();
                info!("📡 Unsubscribed from trade streams");
            }
            None => debug!("Not subscribed - stop ignored"),
        }

        Ok(())
    }
}

impl SubscriptionControl for BinanceTradeStream {
    fn start_subscription<'a>(&'a self, symbols: &'a [String]) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.connect(symbols))
    }

    fn stop_subscription(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.disconnect())
    }
}
