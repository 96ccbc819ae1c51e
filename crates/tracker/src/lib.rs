//! Focused-workspace tracking.
//!
//! Consumes connection events, re-resolves the focused workspace on each
//! notification, and publishes the indicator state the UI shell displays.

mod indicator;
mod tracker;

pub use indicator::Indicator;
pub use tracker::{WmConnection, WorkspaceTracker};
