//! Reconnection logic with exponential backoff.
//!
//! Contains the shared [`WsContext`], cancellation helpers, session
//! callback setup, and the reconnect loop.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::session::WmSession;
use crate::types::{ConnectionEvent, ConnectionState, ReconnectConfig};

/// Shared state handed to the session callbacks and the reconnect loop.
#[derive(Clone)]
pub(crate) struct WsContext {
    pub(crate) endpoint: String,
    pub(crate) session: Arc<Mutex<Option<WmSession>>>,
    pub(crate) state: Arc<RwLock<ConnectionState>>,
    pub(crate) events_tx: mpsc::Sender<ConnectionEvent>,
    pub(crate) reconnect_cancel: Arc<std::sync::Mutex<Option<CancellationToken>>>,
    pub(crate) shutting_down: Arc<AtomicBool>,
    pub(crate) reconnect_config: ReconnectConfig,
}

/// Cancels the active reconnect loop, if any.
pub(crate) fn cancel_reconnect(reconnect_cancel: &std::sync::Mutex<Option<CancellationToken>>) {
    if let Ok(mut guard) = reconnect_cancel.lock()
        && let Some(token) = guard.take()
    {
        token.cancel();
    }
}

/// Stores a fresh cancel token (cancelling any previous loop) and spawns
/// the reconnect loop with it.
pub(crate) fn spawn_reconnect(ctx: WsContext) {
    let cancel = CancellationToken::new();
    cancel_reconnect(&ctx.reconnect_cancel);
    if let Ok(mut guard) = ctx.reconnect_cancel.lock() {
        *guard = Some(cancel.clone());
    }
    tokio::spawn(reconnect_loop(ctx, cancel));
}

/// Wires event forwarding and the disconnect-triggered reconnect loop
/// onto a freshly connected session.
pub(crate) async fn setup_session_callbacks(session: &WmSession, ctx: WsContext) {
    // Event forwarding callback.
    let events_tx = ctx.events_tx.clone();
    session
        .set_event_callback(Box::new(move |msg| {
            trace!(subscription = ?msg.subscription_id, "forwarding event notification");
            if let Err(e) = events_tx.try_send(ConnectionEvent::WmEvent(msg)) {
                warn!("failed to forward event notification: {e}");
            }
        }))
        .await;

    // Disconnect callback — reports the loss and reconnects unless the
    // manager is shutting down.
    let ctx_dc = ctx;
    session
        .set_disconnect_callback(Box::new(move || {
            if let Ok(mut s) = ctx_dc.state.try_write() {
                *s = ConnectionState::Disconnected;
            }
            let _ = ctx_dc.events_tx.try_send(ConnectionEvent::Down);

            if ctx_dc.shutting_down.load(Ordering::Relaxed) {
                return;
            }

            spawn_reconnect(ctx_dc.clone());
        }))
        .await;
}

/// Reconnect loop with exponential backoff against the fixed endpoint.
///
/// Returns a boxed future to break the recursive type cycle with
/// `setup_session_callbacks` (which spawns this function from its
/// disconnect callback).
pub(crate) fn reconnect_loop(
    ctx: WsContext,
    cancel: CancellationToken,
) -> Pin<Box<dyn std::future::Future<Output = ()> + Send>> {
    Box::pin(async move {
        let mut attempt: u32 = 0;

        loop {
            attempt = attempt.saturating_add(1);
            let delay = ctx.reconnect_config.delay_for_attempt(attempt);
            let delay_secs = delay.as_secs_f64();

            *ctx.state.write().await = ConnectionState::Reconnecting { attempt };
            let _ = ctx
                .events_tx
                .send(ConnectionEvent::Reconnecting {
                    attempt,
                    next_retry_secs: delay_secs,
                })
                .await;

            info!(
                attempt,
                delay_secs = format_args!("{delay_secs:.1}"),
                "reconnecting to window manager"
            );

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("reconnect cancelled");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            match WmSession::connect(&ctx.endpoint).await {
                Ok(session) => {
                    setup_session_callbacks(&session, ctx.clone()).await;
                    *ctx.session.lock().await = Some(session);
                    *ctx.state.write().await = ConnectionState::Connected;
                    let _ = ctx.events_tx.send(ConnectionEvent::Up).await;
                    info!("reconnected to window manager");
                    break;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "reconnect attempt failed");
                    // Next attempt with increased backoff.
                }
            }

            if cancel.is_cancelled() {
                return;
            }
        }

        // Clear the cancel slot if it still holds our token. A newer loop
        // would have cancelled ours before installing its own.
        if !cancel.is_cancelled()
            && let Ok(mut guard) = ctx.reconnect_cancel.lock()
        {
            *guard = None;
        }
    })
}
