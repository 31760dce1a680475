// src/core/handler/engine.rs

//! The per-connection protocol state machine.
//!
//! `ProtocolEngine` is deliberately synchronous and knows nothing about sockets
//! or runtimes: a driver feeds it the text of each frame produced by the codec,
//! and everything it emits goes out through the shared `ConnectionRegistry`.
//! The thread-per-connection loop and the reactor tasks are interchangeable
//! drivers over the very same engine.

use super::actions;
use crate::connection::{SessionPhase, SessionState};
use crate::core::StompError;
use crate::core::protocol::frame::RECEIPT;
use crate::core::protocol::{Command, Frame};
use crate::core::state::{ConnectionHandle, ServerState};
use std::sync::Arc;
use tracing::{debug, error, warn};

pub struct ProtocolEngine {
    state: Arc<ServerState>,
    session: SessionState,
}

impl ProtocolEngine {
    /// Creates the engine for a freshly accepted connection and makes the
    /// connection reachable through the registry, so that even a rejected
    /// CONNECT can be answered with an ERROR frame.
    pub fn new(
        connection_id: u64,
        handle: Arc<dyn ConnectionHandle>,
        state: Arc<ServerState>,
    ) -> Self {
        state.connections.register(connection_id, handle);
        Self {
            state,
            session: SessionState::new(connection_id),
        }
    }

    pub fn connection_id(&self) -> u64 {
        self.session.connection_id
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase
    }

    pub fn username(&self) -> Option<&str> {
        self.session.username.as_deref()
    }

    /// True once the session ended and the driver should stop reading.
    pub fn should_terminate(&self) -> bool {
        self.session.is_terminated()
    }

    /// Interprets one frame. Any error ends the session with an ERROR frame.
    pub fn process(&mut self, raw: &str) {
        if self.session.is_terminated() {
            debug!(
                "Connection {}: dropping frame received after termination.",
                self.session.connection_id
            );
            return;
        }
        // Bare EOLs between frames are heart-beats.
        if raw.trim().is_empty() {
            return;
        }
        self.state.stats.increment_total_frames();

        let frame = match Frame::parse(raw) {
            Ok(frame) => frame,
            Err(e) => {
                self.fail(e, None, raw);
                return;
            }
        };
        debug!(
            "Connection {}: received {} in phase {}.",
            self.session.connection_id,
            frame.command(),
            self.session.phase
        );

        if let Err(e) = self.dispatch(&frame) {
            self.fail(e, frame.header(RECEIPT), raw);
        }
    }

    /// Answers a frame the codec could not decode, then ends the session.
    pub fn reject(&mut self, err: StompError) {
        if self.session.is_terminated() {
            return;
        }
        self.state.stats.increment_total_frames();
        self.fail(err, None, "");
    }

    fn dispatch(&mut self, frame: &Frame) -> Result<(), StompError> {
        let session = &mut self.session;
        let state = self.state.as_ref();
        match frame.command() {
            Command::Connect => actions::connection::handle_connect(frame, session, state),
            Command::Send => actions::pubsub::handle_send(frame, session, state),
            Command::Subscribe => actions::pubsub::handle_subscribe(frame, session, state),
            Command::Unsubscribe => actions::pubsub::handle_unsubscribe(frame, session, state),
            Command::Disconnect => actions::connection::handle_disconnect(frame, session, state),
            // Server-to-client frames are not accepted from clients.
            other => Err(StompError::UnknownCommand(other.to_string())),
        }
    }

    /// Reports `err` to the client and tears the whole session down.
    fn fail(&mut self, err: StompError, receipt: Option<&str>, raw: &str) {
        let connection_id = self.session.connection_id;
        match &err {
            StompError::Internal(detail) => {
                error!("Connection {}: internal error: {}", connection_id, detail)
            }
            other => warn!("Connection {}: protocol error: {}", connection_id, other),
        }
        self.state.stats.increment_protocol_errors();

        self.state.purge_session(connection_id);
        let error_frame = Frame::error(&err, receipt, raw);
        self.state
            .connections
            .send_to(connection_id, error_frame.encode_to_bytes());
        self.state.close_connection(connection_id);
        self.session.phase = SessionPhase::Terminated;
    }
}

