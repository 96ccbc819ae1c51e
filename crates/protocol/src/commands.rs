//! Outbound command strings.
//!
//! Commands are plain text, one per frame. Replies echo the exact command
//! text in `clientMessage`, which is what reply correlation keys on.

/// Requests the current monitor/workspace topology.
pub const QUERY_MONITORS: &str = "query monitors";

/// Events subscribed when the configuration lists none.
pub const DEFAULT_EVENTS: &[&str] = &["focus_changed"];

/// Builds a `sub --events <e1> <e2> …` command.
///
/// Returns `None` when `events` is empty; the server requires at least
/// one event name.
pub fn subscribe_command<S: AsRef<str>>(events: &[S]) -> Option<String> {
    if events.is_empty() {
        return None;
    }
    let mut cmd = String::from("sub --events");
    for event in events {
        cmd.push(' ');
        cmd.push_str(event.as_ref());
    }
    Some(cmd)
}
