//! Typed payload of a successful `query monitors` reply.

use serde::{Deserialize, Serialize};

/// The monitor/workspace topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorList {
    #[serde(default)]
    pub monitors: Vec<Monitor>,
}

/// A physical display and the workspaces it holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
    #[serde(default)]
    pub children: Vec<Workspace>,
}

/// A named virtual desktop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub name: String,
    #[serde(default)]
    pub has_focus: bool,
}

impl MonitorList {
    /// Returns the first focused workspace in monitor-then-workspace order.
    ///
    /// The server is expected to flag at most one workspace as focused; if
    /// it ever flags several, the first one in traversal order wins.
    pub fn focused_workspace(&self) -> Option<&Workspace> {
        self.monitors
            .iter()
            .flat_map(|m| m.children.iter())
            .find(|ws| ws.has_focus)
    }
}
