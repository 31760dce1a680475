// src/connection/session.rs

//! Defines the state associated with a single client session.

use strum_macros::Display;

/// Where a session stands in its lifecycle. There is no way back from `Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    AwaitingConnect,
    Connected,
    Terminated,
}

/// Holds the state specific to a single client session.
#[derive(Debug)]
pub struct SessionState {
    /// The id the dispatcher assigned to this connection.
    pub connection_id: u64,
    pub phase: SessionPhase,
    /// The user this session logged in as, once CONNECT succeeded.
    pub username: Option<String>,
}

impl SessionState {
    /// Creates a new `SessionState` waiting for its CONNECT frame.
    pub(crate) fn new(connection_id: u64) -> Self {
        Self {
            connection_id,
            phase: SessionPhase::AwaitingConnect,
            username: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.phase == SessionPhase::Connected
    }

    pub fn is_terminated(&self) -> bool {
        self.phase == SessionPhase::Terminated
    }
}
