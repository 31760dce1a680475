// src/core/handler/actions/connection.rs

use super::reply;
use crate::connection::{SessionPhase, SessionState};
use crate::core::StompError;
use crate::core::protocol::frame::{
    ACCEPT_VERSION, HOST, LOGIN, PASSCODE, RECEIPT, SUPPORTED_VERSION, VERSION,
};
use crate::core::protocol::{Command, Frame};
use crate::core::state::{LoginOutcome, ServerState};
use tracing::{debug, info};

/// Handles CONNECT: checks version and virtual host, then logs the user in.
pub fn handle_connect(
    frame: &Frame,
    session: &mut SessionState,
    state: &ServerState,
) -> Result<(), StompError> {
    if session.is_connected() {
        return Err(StompError::AlreadyConnected);
    }

    let version = frame.required_header(ACCEPT_VERSION)?;
    let host = frame.required_header(HOST)?;
    let login = frame.required_header(LOGIN)?;
    let passcode = frame.required_header(PASSCODE)?;

    if version != SUPPORTED_VERSION {
        return Err(StompError::UnsupportedVersion(version.to_string()));
    }
    if host != state.config.virtual_host {
        return Err(StompError::UnknownHost(host.to_string()));
    }

    match state
        .directory
        .register_or_validate(session.connection_id, login, passcode)
    {
        LoginOutcome::Accepted => {}
        LoginOutcome::WrongPassword => return Err(StompError::WrongPassword(login.to_string())),
        LoginOutcome::AlreadyActive => return Err(StompError::AlreadyActive(login.to_string())),
    }

    session.phase = SessionPhase::Connected;
    session.username = Some(login.to_string());
    info!(
        "Connection {} logged in as '{}'.",
        session.connection_id, login
    );

    let connected = Frame::new(Command::Connected).with_header(VERSION, SUPPORTED_VERSION);
    reply(state, session, &connected);
    Ok(())
}

/// Handles DISCONNECT: releases the user, drops every subscription, confirms
/// with a RECEIPT and closes the connection.
pub fn handle_disconnect(
    frame: &Frame,
    session: &mut SessionState,
    state: &ServerState,
) -> Result<(), StompError> {
    state.purge_session(session.connection_id);

    let receipt = Frame::receipt(frame.header(RECEIPT).filter(|r| !r.is_empty()));
    reply(state, session, &receipt);

    state.close_connection(session.connection_id);
    session.phase = SessionPhase::Terminated;
    debug!(
        "Connection {} disconnected ({}).",
        session.connection_id,
        session.username.as_deref().unwrap_or("anonymous")
    );
    Ok(())
}
