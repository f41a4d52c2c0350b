//! Propagation Socket
//!
//! Maintains the persistent WebSocket subscription to the authority. Parsed
//! push events are forwarded into a bounded queue; connection health is
//! published over a watch channel so the dispatcher can mark local records
//! stale and trigger a resync on reconnect.

use anyhow::{Result, anyhow};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, watch};
use tokio::time::{Duration, sleep};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::types::{ChannelStatus, PushEvent};

/// Capacity of the bounded push queue feeding the dispatcher.
const PUSH_QUEUE_CAPACITY: usize = 64;

/// Propagation socket configuration
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// WebSocket endpoint, e.g. `wss://api.example.com/v1/stream`
    pub url: String,
    /// Session token appended to the connection URL (optional)
    pub session_token: Option<String>,
    /// First reconnect delay in milliseconds (default: 1000)
    pub reconnect_initial_ms: u64,
    /// Reconnect delay cap in milliseconds (default: 30000)
    pub reconnect_max_ms: u64,
}

impl SocketConfig {
    /// Create a new config with just the endpoint URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            session_token: None,
            reconnect_initial_ms: 1_000,
            reconnect_max_ms: 30_000,
        }
    }

    /// Set the session token
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Set the reconnect backoff bounds
    pub fn with_reconnect_ms(mut self, initial: u64, max: u64) -> Self {
        self.reconnect_initial_ms = initial;
        self.reconnect_max_ms = max;
        self
    }

    /// Full connection URL including the token query parameter.
    fn endpoint(&self) -> String {
        match &self.session_token {
            Some(token) => {
                let separator = if self.url.contains('?') { '&' } else { '?' };
                format!("{}{}token={}", self.url, separator, token)
            }
            None => self.url.clone(),
        }
    }
}

/// Doubled, capped reconnect delay.
fn next_backoff(current: Duration, max: Duration) -> Duration {
    (current * 2).min(max)
}

/// Persistent push subscription with automatic reconnect.
pub struct SocketChannel {
    config: SocketConfig,
    shutdown: CancellationToken,
    running: AtomicBool,
}

impl SocketChannel {
    /// Create a channel for the given endpoint.
    pub fn new(config: SocketConfig) -> Self {
        Self {
            config,
            shutdown: CancellationToken::new(),
            running: AtomicBool::new(false),
        }
    }

    /// Spawn the connection loop.
    ///
    /// Returns the push queue and the status feed. Starting twice is refused
    /// so handlers are never registered in duplicate; dropping the receivers
    /// (or calling [`stop`](Self::stop)) ends delivery.
    pub fn start(
        &self,
    ) -> Result<(mpsc::Receiver<PushEvent>, watch::Receiver<ChannelStatus>)> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(anyhow!("propagation channel already started"));
        }

        let (events_tx, events_rx) = mpsc::channel(PUSH_QUEUE_CAPACITY);
        let (status_tx, status_rx) = watch::channel(ChannelStatus::Connecting);

        let config = self.config.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            run_loop(config, shutdown, events_tx, status_tx).await;
        });

        Ok((events_rx, status_rx))
    }

    /// Close the connection and end the loop.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}

async fn run_loop(
    config: SocketConfig,
    shutdown: CancellationToken,
    events_tx: mpsc::Sender<PushEvent>,
    status_tx: watch::Sender<ChannelStatus>,
) {
    let endpoint = config.endpoint();
    let initial = Duration::from_millis(config.reconnect_initial_ms);
    let max = Duration::from_millis(config.reconnect_max_ms);
    let mut backoff = initial;

    loop {
        let _ = status_tx.send(ChannelStatus::Connecting);

        match connect_async(endpoint.as_str()).await {
            Ok((mut socket, _)) => {
                info!("Propagation channel connected");
                let _ = status_tx.send(ChannelStatus::Connected);
                backoff = initial;

                loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => {
                            let _ = socket.close(None).await;
                            return;
                        }
                        frame = socket.next() => match frame {
                            Some(Ok(Message::Text(text))) => {
                                match serde_json::from_str::<PushEvent>(text.as_str()) {
                                    Ok(event) => {
                                        if events_tx.send(event).await.is_err() {
                                            // Dispatcher dropped; unsubscribe.
                                            let _ = socket.close(None).await;
                                            return;
                                        }
                                    }
                                    Err(error) => {
                                        warn!(error = %error, "Ignoring unparseable push frame");
                                    }
                                }
                            }
                            Some(Ok(Message::Ping(payload))) => {
                                let _ = socket.send(Message::Pong(payload)).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Propagation socket closed by server");
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(error)) => {
                                warn!(error = %error, "Propagation socket error");
                                break;
                            }
                        }
                    }
                }
            }
            Err(error) => {
                warn!(error = %error, "Failed to connect propagation channel");
            }
        }

        let _ = status_tx.send(ChannelStatus::Disconnected);

        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = sleep(backoff) => {}
        }
        backoff = next_backoff(backoff, max);
    }
}
