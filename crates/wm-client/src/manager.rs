//! Connection manager for the window manager socket.
//!
//! Owns the session lifecycle against a fixed endpoint, forwards push
//! events to its consumer, and reconnects automatically with exponential
//! backoff on unexpected disconnects.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use glazetray_protocol::commands::QUERY_MONITORS;
use glazetray_protocol::envelope::ServerMessage;
use glazetray_protocol::topology::MonitorList;

use crate::reconnection::{WsContext, cancel_reconnect, setup_session_callbacks, spawn_reconnect};
use crate::session::{ClientError, WmSession};
use crate::types::{ConnectionEvent, ConnectionState, ReconnectConfig};

/// Connection manager for a single window manager endpoint.
///
/// Exactly one live session exists at a time; commands are delegated to
/// it and fail with [`ClientError::Closed`] when there is none.
pub struct ConnectionManager {
    pub(crate) endpoint: String,
    pub(crate) session: Arc<Mutex<Option<WmSession>>>,
    pub(crate) state: Arc<RwLock<ConnectionState>>,
    pub(crate) events_tx: mpsc::Sender<ConnectionEvent>,
    pub(crate) events_rx: Mutex<Option<mpsc::Receiver<ConnectionEvent>>>,
    /// Cancel token for the active reconnect loop.
    pub(crate) reconnect_cancel: Arc<std::sync::Mutex<Option<CancellationToken>>>,
    /// Set when shutdown is requested, suppressing reconnection.
    pub(crate) shutting_down: Arc<AtomicBool>,
    pub(crate) reconnect_config: ReconnectConfig,
}

impl ConnectionManager {
    /// Creates a new connection manager for the given endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(64);

        Self {
            endpoint: endpoint.into(),
            session: Arc::new(Mutex::new(None)),
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            reconnect_cancel: Arc::new(std::sync::Mutex::new(None)),
            shutting_down: Arc::new(AtomicBool::new(false)),
            reconnect_config: ReconnectConfig::default(),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub async fn take_events(&self) -> Option<mpsc::Receiver<ConnectionEvent>> {
        self.events_rx.lock().await.take()
    }

    /// Returns the current connection state.
    pub async fn state(&self) -> ConnectionState {
        self.state.read().await.clone()
    }

    /// Connects to the endpoint and wires the session callbacks.
    ///
    /// On failure the error is returned and `ConnectionEvent::Down` is
    /// emitted so the consumer can show its error state; call
    /// [`start_reconnect`](Self::start_reconnect) to keep retrying in
    /// the background.
    pub async fn connect(&self) -> Result<(), ClientError> {
        cancel_reconnect(&self.reconnect_cancel);
        self.shutting_down.store(false, Ordering::Relaxed);

        *self.state.write().await = ConnectionState::Connecting;
        info!(endpoint = %self.endpoint, "connecting to window manager");

        let session = match WmSession::connect(&self.endpoint).await {
            Ok(s) => s,
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "connection failed");
                *self.state.write().await = ConnectionState::Disconnected;
                let _ = self.events_tx.send(ConnectionEvent::Down).await;
                return Err(e);
            }
        };

        setup_session_callbacks(&session, self.ws_context()).await;
        *self.session.lock().await = Some(session);
        *self.state.write().await = ConnectionState::Connected;
        let _ = self.events_tx.send(ConnectionEvent::Up).await;

        info!("connected to window manager");
        Ok(())
    }

    /// Starts the background reconnect loop. Used after a failed initial
    /// [`connect`](Self::connect); unexpected disconnects start the loop
    /// on their own.
    pub fn start_reconnect(&self) {
        spawn_reconnect(self.ws_context());
    }

    /// Sends a command without waiting for a reply.
    pub async fn send(&self, command: &str) -> Result<(), ClientError> {
        let session = self.session.lock().await;
        let session = session.as_ref().ok_or(ClientError::Closed)?;
        session.send(command).await
    }

    /// Sends a command and waits for the correlated reply.
    pub async fn send_command(&self, command: &str) -> Result<ServerMessage, ClientError> {
        let session = self.session.lock().await;
        let session = session.as_ref().ok_or(ClientError::Closed)?;
        session.send_command(command).await
    }

    /// Queries the monitor/workspace topology.
    pub async fn query_monitors(&self) -> Result<MonitorList, ClientError> {
        let reply = self.send_command(QUERY_MONITORS).await?;
        reply
            .parse_data::<MonitorList>()?
            .ok_or(ClientError::MalformedReply("monitors reply without data"))
    }

    /// Shuts down the manager and closes the session. Safe to call
    /// repeatedly.
    pub async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Relaxed);
        cancel_reconnect(&self.reconnect_cancel);
        if let Some(session) = self.session.lock().await.take() {
            session.close().await;
        }
        *self.state.write().await = ConnectionState::Disconnected;
        info!("connection manager shut down");
    }

    /// Builds a [`WsContext`] from the current manager state.
    pub(crate) fn ws_context(&self) -> WsContext {
        WsContext {
            endpoint: self.endpoint.clone(),
            session: self.session.clone(),
            state: self.state.clone(),
            events_tx: self.events_tx.clone(),
            reconnect_cancel: self.reconnect_cancel.clone(),
            shutting_down: self.shutting_down.clone(),
            reconnect_config: self.reconnect_config.clone(),
        }
    }
}
