//! WebSocket session for the GlazeWM IPC socket.
//!
//! Implements request-response with reply correlation keyed by command
//! text, and push event dispatching for subscribed notifications.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_tungstenite::tungstenite;

use glazetray_protocol::constants::{QUERY_TIMEOUT, WS_MAX_MESSAGE_SIZE};
use glazetray_protocol::envelope::ServerMessage;

/// Errors from the WebSocket session.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("WebSocket error: {0}")]
    Ws(#[from] tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request timed out")]
    Timeout,

    #[error("connection closed")]
    Closed,

    #[error("server rejected command: {0}")]
    Rejected(String),

    #[error("malformed reply: {0}")]
    MalformedReply(&'static str),
}

/// Callback type for event notifications pushed by the server.
pub type EventCallback = Box<dyn Fn(ServerMessage) + Send + Sync>;

/// Callback type for disconnect notification.
pub(crate) type DisconnectCallback = Arc<Mutex<Option<Box<dyn Fn() + Send + Sync>>>>;

/// In-flight commands awaiting their reply, keyed by the exact command
/// text the reply will echo back in `clientMessage`.
pub(crate) type PendingReplies = Arc<Mutex<HashMap<String, oneshot::Sender<ServerMessage>>>>;

/// A live session on the window manager's IPC socket.
///
/// Exactly one connection per session; dropping the session tears down
/// the read/write/ping pumps.
pub struct WmSession {
    write_tx: mpsc::Sender<tungstenite::Message>,
    pending: PendingReplies,
    /// Held across send-and-await so at most one command is in flight.
    /// Correlation is by command text only; two identical commands in
    /// flight at once could not be told apart.
    query_gate: Mutex<()>,
    on_event: Arc<Mutex<Option<EventCallback>>>,
    on_disconnect: DisconnectCallback,
    _read_handle: tokio::task::JoinHandle<()>,
    _write_handle: tokio::task::JoinHandle<()>,
    _ping_handle: tokio::task::JoinHandle<()>,
    cancel: tokio_util::sync::CancellationToken,
}

impl WmSession {
    /// Connects to the IPC socket and spawns the read, write, and ping
    /// pumps.
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let mut ws_config = tokio_tungstenite::tungstenite::protocol::WebSocketConfig::default();
        ws_config.max_message_size = Some(WS_MAX_MESSAGE_SIZE);
        ws_config.max_frame_size = Some(WS_MAX_MESSAGE_SIZE);
        let (ws_stream, _) =
            tokio_tungstenite::connect_async_with_config(url, Some(ws_config), false).await?;
        let (write, read) = ws_stream.split();

        let (write_tx, write_rx) = mpsc::channel::<tungstenite::Message>(64);
        let pending: PendingReplies = Arc::new(Mutex::new(HashMap::new()));
        let on_event: Arc<Mutex<Option<EventCallback>>> = Arc::new(Mutex::new(None));
        let on_disconnect: DisconnectCallback = Arc::new(Mutex::new(None));
        let cancel = tokio_util::sync::CancellationToken::new();

        let write_handle = {
            let cancel = cancel.clone();
            tokio::spawn(crate::pumps::write::write_pump(write, write_rx, cancel))
        };

        let read_handle = {
            let pending = pending.clone();
            let on_event = on_event.clone();
            let on_disconnect = on_disconnect.clone();
            let write_tx = write_tx.clone();
            let cancel = cancel.clone();
            tokio::spawn(crate::pumps::read::read_pump(
                read,
                pending,
                on_event,
                on_disconnect,
                write_tx,
                cancel,
            ))
        };

        let ping_handle = {
            let write_tx = write_tx.clone();
            let cancel = cancel.clone();
            tokio::spawn(crate::pumps::ping::ping_pump(write_tx, cancel))
        };

        Ok(Self {
            write_tx,
            pending,
            query_gate: Mutex::new(()),
            on_event,
            on_disconnect,
            _read_handle: read_handle,
            _write_handle: write_handle,
            _ping_handle: ping_handle,
            cancel,
        })
    }

    /// Sends a command without waiting for a reply.
    ///
    /// Frames are queued to the write pump, the sole writer on the
    /// socket, so concurrent senders never interleave mid-frame.
    pub async fn send(&self, command: &str) -> Result<(), ClientError> {
        self.write_tx
            .send(tungstenite::Message::Text(command.into()))
            .await
            .map_err(|_| ClientError::Closed)
    }

    /// Sends a command and waits for the reply that echoes it.
    ///
    /// Event notifications arriving before the reply are dispatched to
    /// the event callback by the read pump; the wait here only completes
    /// on the correlated reply, or fails after [`QUERY_TIMEOUT`].
    pub async fn send_command(&self, command: &str) -> Result<ServerMessage, ClientError> {
        let _gate = self.query_gate.lock().await;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(command.to_string(), tx);

        if let Err(e) = self.send(command).await {
            self.pending.lock().await.remove(command);
            return Err(e);
        }

        let result = tokio::time::timeout(QUERY_TIMEOUT, rx).await;

        // Clean up the pending entry on any exit path.
        self.pending.lock().await.remove(command);

        match result {
            Ok(Ok(reply)) => {
                if !reply.success {
                    let detail = reply
                        .error_text()
                        .unwrap_or_else(|| "unknown error".into());
                    return Err(ClientError::Rejected(detail));
                }
                Ok(reply)
            }
            Ok(Err(_)) => Err(ClientError::Closed),
            Err(_) => Err(ClientError::Timeout),
        }
    }

    /// Sets the callback for event notifications.
    pub async fn set_event_callback(&self, cb: EventCallback) {
        *self.on_event.lock().await = Some(cb);
    }

    /// Sets the callback for disconnection.
    pub async fn set_disconnect_callback(&self, cb: Box<dyn Fn() + Send + Sync>) {
        *self.on_disconnect.lock().await = Some(cb);
    }

    /// Gracefully closes the connection. Idempotent.
    pub async fn close(&self) {
        self.cancel.cancel();
        let _ = self.write_tx.send(tungstenite::Message::Close(None)).await;
    }
}

impl Drop for WmSession {
    fn drop(&mut self) {
        self.cancel.cancel();
        self._read_handle.abort();
        self._write_handle.abort();
        self._ping_handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_session() -> (WmSession, mpsc::Receiver<tungstenite::Message>) {
        let (write_tx, write_rx) = mpsc::channel::<tungstenite::Message>(16);
        let session = WmSession {
            write_tx,
            pending: Arc::new(Mutex::new(HashMap::new())),
            query_gate: Mutex::new(()),
            on_event: Arc::new(Mutex::new(None)),
            on_disconnect: Arc::new(Mutex::new(None)),
            _read_handle: tokio::spawn(async {}),
            _write_handle: tokio::spawn(async {}),
            _ping_handle: tokio::spawn(async {}),
            cancel: tokio_util::sync::CancellationToken::new(),
        };
        (session, write_rx)
    }

    fn reply_for(command: &str) -> ServerMessage {
        serde_json::from_str(&format!(
            r#"{{
                "messageType": "client_response",
                "clientMessage": "{command}",
                "data": {{"monitors": []}},
                "success": true
            }}"#
        ))
        .unwrap()
    }

    fn rejection_for(command: &str) -> ServerMessage {
        serde_json::from_str(&format!(
            r#"{{
                "messageType": "client_response",
                "clientMessage": "{command}",
                "error": "no such command",
                "success": false
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn client_error_display() {
        assert_eq!(ClientError::Timeout.to_string(), "request timed out");
        assert_eq!(ClientError::Closed.to_string(), "connection closed");
        assert_eq!(
            ClientError::Rejected("bad args".into()).to_string(),
            "server rejected command: bad args"
        );
        assert!(
            ClientError::MalformedReply("monitors reply without data")
                .to_string()
                .contains("monitors reply without data")
        );
    }

    #[tokio::test]
    async fn send_command_writes_frame_and_registers_pending() {
        let (session, mut write_rx) = test_session();
        let session = Arc::new(session);

        let s = session.clone();
        let handle = tokio::spawn(async move { s.send_command("query monitors").await });

        let frame = write_rx.recv().await.unwrap();
        match frame {
            tungstenite::Message::Text(text) => assert_eq!(text.as_str(), "query monitors"),
            other => panic!("expected text frame, got {other:?}"),
        }

        let tx = session
            .pending
            .lock()
            .await
            .remove("query monitors")
            .expect("pending entry registered under the command text");
        tx.send(reply_for("query monitors")).unwrap();

        let reply = handle.await.unwrap().unwrap();
        assert_eq!(reply.client_message.as_deref(), Some("query monitors"));
        assert!(session.pending.lock().await.is_empty());
    }

    #[tokio::test]
    async fn send_command_surfaces_server_rejection() {
        let (session, mut write_rx) = test_session();
        let session = Arc::new(session);

        let s = session.clone();
        let handle = tokio::spawn(async move { s.send_command("query bogus").await });

        let _ = write_rx.recv().await.unwrap();
        let tx = session.pending.lock().await.remove("query bogus").unwrap();
        tx.send(rejection_for("query bogus")).unwrap();

        let result = handle.await.unwrap();
        match result {
            Err(ClientError::Rejected(detail)) => assert_eq!(detail, "no such command"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_command_times_out_without_reply() {
        tokio::time::pause();

        let (session, mut write_rx) = test_session();
        let session = Arc::new(session);

        let s = session.clone();
        let handle = tokio::spawn(async move { s.send_command("query monitors").await });

        let _ = write_rx.recv().await.unwrap();

        // With paused time the runtime advances straight to the timeout.
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(ClientError::Timeout)));
        assert!(session.pending.lock().await.is_empty());
    }

    #[tokio::test]
    async fn queries_are_serialized_by_the_gate() {
        let (session, mut write_rx) = test_session();
        let session = Arc::new(session);

        let s1 = session.clone();
        let first = tokio::spawn(async move { s1.send_command("query monitors").await });

        // First command reaches the wire.
        let _ = write_rx.recv().await.unwrap();

        let s2 = session.clone();
        let second = tokio::spawn(async move { s2.send_command("query monitors").await });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        // The second identical command must not be written while the
        // first is still in flight.
        assert!(write_rx.try_recv().is_err());

        let tx = session.pending.lock().await.remove("query monitors").unwrap();
        tx.send(reply_for("query monitors")).unwrap();
        assert!(first.await.unwrap().is_ok());

        // Gate released — the second command goes out now.
        let _ = write_rx.recv().await.unwrap();
        let tx = session.pending.lock().await.remove("query monitors").unwrap();
        tx.send(reply_for("query monitors")).unwrap();
        assert!(second.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn send_fails_once_the_write_pump_is_gone() {
        let (session, write_rx) = test_session();
        drop(write_rx);

        let result = session.send("query monitors").await;
        assert!(matches!(result, Err(ClientError::Closed)));

        let result = session.send_command("query monitors").await;
        assert!(matches!(result, Err(ClientError::Closed)));
        assert!(session.pending.lock().await.is_empty());
    }
}
