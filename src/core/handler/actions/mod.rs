// src/core/handler/actions/mod.rs

// Declare all action modules.
// The engine accesses them via `actions::module::function`.
pub mod connection;
pub mod pubsub;

use crate::connection::SessionState;
use crate::core::StompError;
use crate::core::protocol::{Command, Frame};
use crate::core::state::ServerState;

/// Sends one frame back to the connection that owns `session`.
pub(super) fn reply(state: &ServerState, session: &SessionState, frame: &Frame) -> bool {
    state
        .connections
        .send_to(session.connection_id, frame.encode_to_bytes())
}

/// Rejects frames that need a logged-in session.
pub(super) fn require_connected(
    session: &SessionState,
    command: Command,
) -> Result<(), StompError> {
    if session.is_connected() {
        Ok(())
    } else {
        Err(StompError::NotConnected(command.to_string()))
    }
}
