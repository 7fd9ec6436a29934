// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use crate::config::LiveConfig;
use crate::dispatch::MessageDispatcher;
use crate::fleet_dataset::{ConnectionState, PING_FRAME};
use crate::position_store::PositionStore;
use crate::shutdown::ShutdownSignal;
use futures::{SinkExt, StreamExt};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{info, warn};

/// Owns the one streaming connection: the socket, the keepalive timer and
/// the reconnect timer all live inside the supervisor task, with the state
/// machine Disconnected -> Connecting -> Connected -> Disconnected ->
/// Reconnecting -> Connecting -> ... There is no terminal state while the
/// client is alive; transport failures only ever show up through `state()`
/// and `last_error()`.
pub struct ConnectionManager {
    config: LiveConfig,
    dispatcher: Arc<MessageDispatcher>,
    state: Arc<RwLock<ConnectionState>>,
    last_error: Arc<RwLock<Option<String>>>,
    shutdown: ShutdownSignal,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

enum StreamEnd {
    Closed(String),
    Shutdown,
}

impl ConnectionManager {
    pub fn new(config: LiveConfig, store: PositionStore, shutdown: ShutdownSignal) -> Self {
        Self {
            config,
            dispatcher: Arc::new(MessageDispatcher::new(store)),
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            last_error: Arc::new(RwLock::new(None)),
            shutdown,
            supervisor: Mutex::new(None),
        }
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub async fn is_connected(&self) -> bool {
        self.state().await == ConnectionState::Connected
    }

    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    /// Idempotent entry point: a still-running supervisor makes this a
    /// no-op, otherwise one supervisor task is spawned.
    pub async fn connect(&self) {
        let mut supervisor = self.supervisor.lock().await;
        if let Some(handle) = supervisor.as_ref() {
            if !handle.is_finished() {
                return;
            }
        }
        let config = self.config.clone();
        let dispatcher = self.dispatcher.clone();
        let state = self.state.clone();
        let last_error = self.last_error.clone();
        let shutdown = self.shutdown.clone();
        *supervisor = Some(tokio::spawn(async move {
            supervise(config, dispatcher, state, last_error, shutdown).await;
        }));
    }

    /// Trips the shared shutdown signal and waits for the supervisor to
    /// close the socket and drop its timers. In-flight fetches observe the
    /// same signal and abort without touching the store.
    pub async fn teardown(&self) {
        self.shutdown.trip();
        let handle = self.supervisor.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        *self.state.write().await = ConnectionState::Disconnected;
    }
}

async fn supervise(
    config: LiveConfig,
    dispatcher: Arc<MessageDispatcher>,
    state: Arc<RwLock<ConnectionState>>,
    last_error: Arc<RwLock<Option<String>>>,
    shutdown: ShutdownSignal,
) {
    let mut consecutive_failures: u32 = 0;
    loop {
        if shutdown.is_tripped() {
            break;
        }
        *state.write().await = ConnectionState::Connecting;
        match connect_async(config.stream_url.as_str()).await {
            Ok((socket, _response)) => {
                consecutive_failures = 0;
                *state.write().await = ConnectionState::Connected;
                *last_error.write().await = None;
                info!("stream connected to {}", config.stream_url);
                match drive_stream(socket, &dispatcher, &config, &shutdown).await {
                    StreamEnd::Shutdown => break,
                    StreamEnd::Closed(reason) => {
                        *state.write().await = ConnectionState::Disconnected;
                        *last_error.write().await = Some(reason.clone());
                        warn!("stream closed: {}", reason);
                    }
                }
            }
            Err(e) => {
                *state.write().await = ConnectionState::Disconnected;
                *last_error.write().await = Some(e.to_string());
                warn!("stream connect to {} failed: {}", config.stream_url, e);
            }
        }

        //exactly one pending reconnect at a time
        consecutive_failures = consecutive_failures.saturating_add(1);
        let delay = reconnect_delay(&config, consecutive_failures);
        *state.write().await = ConnectionState::Reconnecting;
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.tripped() => break,
        }
    }
    *state.write().await = ConnectionState::Disconnected;
}

/// Runs one open socket to completion: dispatches inbound text frames and
/// sends the JSON keepalive ping at the configured interval. Returns why
/// the session ended; the keepalive timer dies with this scope.
async fn drive_stream(
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    dispatcher: &MessageDispatcher,
    config: &LiveConfig,
    shutdown: &ShutdownSignal,
) -> StreamEnd {
    let (mut write, mut read) = socket.split();
    let first_ping = tokio::time::Instant::now() + config.keepalive_interval;
    let mut keepalive = tokio::time::interval_at(first_ping, config.keepalive_interval);

    loop {
        tokio::select! {
            _ = shutdown.tripped() => {
                let _ = write.send(Message::Close(None)).await;
                return StreamEnd::Shutdown;
            }
            _ = keepalive.tick() => {
                if let Err(e) = write.send(Message::text(PING_FRAME)).await {
                    return StreamEnd::Closed(format!("keepalive send failed: {}", e));
                }
            }
            inbound = read.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => dispatcher.apply_text(text.as_str()).await,
                    Some(Ok(Message::Close(_))) => {
                        return StreamEnd::Closed("closed by server".to_string());
                    }
                    //binary and ping/pong control frames are handled by the
                    //protocol layer
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return StreamEnd::Closed(e.to_string()),
                    None => return StreamEnd::Closed("stream ended".to_string()),
                }
            }
        }
    }
}

/// Exponential backoff from the base delay, doubling per consecutive
/// failure, capped, with up to a second of uniform jitter on top.
fn reconnect_delay(config: &LiveConfig, consecutive_failures: u32) -> Duration {
    let doublings = consecutive_failures.saturating_sub(1).min(16);
    let exponential = config
        .reconnect_base_delay
        .saturating_mul(2u32.saturating_pow(doublings));
    let capped = exponential.min(config.reconnect_max_delay);
    capped + Duration::from_millis(rand::rng().random_range(0..=1000))
}
