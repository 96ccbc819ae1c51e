//! Wire protocol types for the GlazeWM IPC socket.
//!
//! GlazeWM accepts plain-text commands over a local WebSocket and answers
//! with one JSON object per frame. Event notifications and command replies
//! are multiplexed on the same stream; the envelope's `messageType` field
//! tells them apart.

pub mod commands;
pub mod constants;
pub mod envelope;
pub mod topology;
