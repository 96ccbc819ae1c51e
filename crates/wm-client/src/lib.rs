//! WebSocket client for the GlazeWM IPC socket.
//!
//! Provides the session (request-response with reply correlation and push
//! event dispatch) and a connection manager that owns the session
//! lifecycle and reconnects with exponential backoff.

pub mod manager;
pub(crate) mod pumps;
pub(crate) mod reconnection;
pub mod session;
pub mod types;

pub use manager::ConnectionManager;
pub use session::{ClientError, WmSession};
pub use types::{ConnectionEvent, ConnectionState, ReconnectConfig};
