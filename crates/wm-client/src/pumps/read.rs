//! WebSocket read pump — classifies and dispatches inbound frames.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use glazetray_protocol::constants::{WS_MAX_MESSAGE_SIZE, WS_PONG_WAIT};
use glazetray_protocol::envelope::{MessageKind, ServerMessage};

use crate::session::{DisconnectCallback, EventCallback, PendingReplies};

/// Reads frames from the WebSocket and dispatches them in arrival order.
///
/// Uses a read deadline to detect dead connections: any inbound traffic
/// (pong, reply, event notification) resets it; if nothing arrives within
/// [`WS_PONG_WAIT`] the connection is considered dead and the loop exits.
pub(crate) async fn read_pump<S>(
    mut read: S,
    pending: PendingReplies,
    on_event: Arc<Mutex<Option<EventCallback>>>,
    on_disconnect: DisconnectCallback,
    write_tx: mpsc::Sender<tungstenite::Message>,
    cancel: CancellationToken,
) where
    S: StreamExt<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    let pong_deadline = tokio::time::sleep(WS_PONG_WAIT);
    tokio::pin!(pong_deadline);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            () = &mut pong_deadline => {
                warn!("read deadline elapsed — connection dead, closing");
                break;
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(msg)) => {
                        pong_deadline.as_mut().reset(tokio::time::Instant::now() + WS_PONG_WAIT);

                        match msg {
                            tungstenite::Message::Text(text) => {
                                dispatch_frame(&text, &pending, &on_event).await;
                            }
                            tungstenite::Message::Ping(data) => {
                                trace!("received ping, sending pong");
                                let _ = write_tx.send(tungstenite::Message::Pong(data)).await;
                            }
                            tungstenite::Message::Pong(_) => {
                                trace!("received pong");
                            }
                            tungstenite::Message::Close(_) => {
                                debug!("received close frame");
                                break;
                            }
                            _ => {} // Binary — the protocol is text-only
                        }
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket read error: {e}");
                        break;
                    }
                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }
                }
            }
        }
    }

    if let Some(cb) = on_disconnect.lock().await.as_ref() {
        cb();
    }
}

/// Decodes one frame and routes it: replies to the pending command that
/// sent the echoed text, event notifications to the event callback.
/// Undecodable frames are logged and dropped; the loop continues.
async fn dispatch_frame(
    text: &str,
    pending: &PendingReplies,
    on_event: &Arc<Mutex<Option<EventCallback>>>,
) {
    if text.len() > WS_MAX_MESSAGE_SIZE {
        warn!("frame too large ({} bytes), dropping", text.len());
        return;
    }

    let msg: ServerMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            warn!("failed to decode frame: {e}");
            return;
        }
    };

    match msg.message_type {
        MessageKind::ClientResponse => {
            let Some(command) = msg.client_message.clone() else {
                debug!("reply without clientMessage echo, dropping");
                return;
            };
            let mut map = pending.lock().await;
            if let Some(tx) = map.remove(&command) {
                let _ = tx.send(msg);
            } else {
                drop(map);
                debug!(command = %command, "unsolicited reply, dropping");
            }
        }
        MessageKind::EventSubscription => {
            trace!(subscription = ?msg.subscription_id, "event notification");
            let guard = on_event.lock().await;
            if let Some(cb) = guard.as_ref() {
                cb(msg);
            } else {
                debug!("no event callback set, dropping notification");
            }
        }
        MessageKind::Unknown => {
            trace!("unrecognized message type, dropping");
        }
    }
}
