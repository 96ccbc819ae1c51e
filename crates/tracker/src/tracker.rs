//! The tracker event loop: connection events in, indicator state out.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use glazetray_protocol::commands::subscribe_command;
use glazetray_protocol::topology::MonitorList;
use glazetray_wm_client::{ClientError, ConnectionEvent, ConnectionManager};

use crate::indicator::Indicator;

/// Transport seam for the tracker: subscribing to events and querying
/// the monitor topology.
pub trait WmConnection: Send + Sync {
    fn send(&self, command: &str) -> impl Future<Output = Result<(), ClientError>> + Send;
    fn query_monitors(&self) -> impl Future<Output = Result<MonitorList, ClientError>> + Send;
}

impl WmConnection for ConnectionManager {
    async fn send(&self, command: &str) -> Result<(), ClientError> {
        ConnectionManager::send(self, command).await
    }

    async fn query_monitors(&self) -> Result<MonitorList, ClientError> {
        ConnectionManager::query_monitors(self).await
    }
}

impl<C: WmConnection> WmConnection for Arc<C> {
    fn send(&self, command: &str) -> impl Future<Output = Result<(), ClientError>> + Send {
        (**self).send(command)
    }

    fn query_monitors(&self) -> impl Future<Output = Result<MonitorList, ClientError>> + Send {
        (**self).query_monitors()
    }
}

/// Tracks the focused workspace and publishes the indicator state.
///
/// Single writer of the indicator channel; the UI shell holds the watch
/// receiver and repaints on change.
pub struct WorkspaceTracker<C> {
    conn: C,
    events: Vec<String>,
    indicator_tx: watch::Sender<Indicator>,
    cancel: CancellationToken,
}

impl<C: WmConnection> WorkspaceTracker<C> {
    /// Creates a tracker and the indicator receiver for the UI shell.
    pub fn new(
        conn: C,
        events: Vec<String>,
        cancel: CancellationToken,
    ) -> (Self, watch::Receiver<Indicator>) {
        let (indicator_tx, indicator_rx) = watch::channel(Indicator::Default);
        (
            Self {
                conn,
                events,
                indicator_tx,
                cancel,
            },
            indicator_rx,
        )
    }

    /// Runs the tracker loop until the event channel closes or shutdown
    /// is requested.
    pub async fn run(&self, mut events_rx: mpsc::Receiver<ConnectionEvent>) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                ev = events_rx.recv() => match ev {
                    Some(ConnectionEvent::Up) => {
                        self.subscribe().await;
                        self.refresh().await;
                    }
                    Some(ConnectionEvent::WmEvent(_)) => {
                        // Any subscribed event means the topology may have
                        // changed; the payload itself is not inspected.
                        self.refresh().await;
                    }
                    Some(ConnectionEvent::Down) => {
                        self.publish(Indicator::Error);
                    }
                    Some(ConnectionEvent::Reconnecting { .. }) => {}
                    None => break,
                },
            }
        }
    }

    /// Sends the event subscription. No acknowledgment is awaited; the
    /// notifications themselves are the signal.
    async fn subscribe(&self) {
        let Some(cmd) = subscribe_command(&self.events) else {
            warn!("no events configured, skipping subscription");
            return;
        };
        if let Err(e) = self.conn.send(&cmd).await {
            warn!(error = %e, "failed to subscribe to events");
        }
    }

    /// Queries the topology and publishes the resolved indicator. Query
    /// failures degrade to the default indicator and are never
    /// propagated.
    async fn refresh(&self) {
        let indicator = match self.conn.query_monitors().await {
            Ok(topology) => resolve(&topology),
            Err(e) => {
                warn!(error = %e, "monitor query failed, falling back to default");
                Indicator::Default
            }
        };
        self.publish(indicator);
    }

    fn publish(&self, indicator: Indicator) {
        if *self.indicator_tx.borrow() != indicator {
            debug!(icon = %indicator.icon_key(), "indicator updated");
            let _ = self.indicator_tx.send(indicator);
        }
    }
}

/// Maps a topology to the indicator: the first focused workspace in
/// traversal order wins; no focus falls back to the default icon.
fn resolve(topology: &MonitorList) -> Indicator {
    match topology.focused_workspace() {
        Some(ws) => Indicator::Workspace(ws.name.clone()),
        None => Indicator::Default,
    }
}
