// src/core/errors.rs

//! Defines the primary error type for the entire application.

use std::sync::Arc;
use thiserror::Error;

/// The main error enum, representing every failure a connection can run into.
///
/// The `Display` output of each variant is exactly what ends up in the `message`
/// header of the ERROR frame sent back to the client, so internal details must
/// never leak through it.
#[derive(Error, Debug, Clone)]
pub enum StompError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Frame is not valid UTF-8")]
    InvalidUtf8,

    #[error("Frame exceeds the maximum size of {0} bytes")]
    FrameTooLarge(usize),

    #[error("Empty frame")]
    EmptyFrame,

    #[error("Unsupported command")]
    UnknownCommand(String),

    #[error("Malformed header line: {0}")]
    MalformedHeader(String),

    #[error("Missing {0} header")]
    MissingHeader(&'static str),

    #[error("Invalid CONNECT frame: unsupported version '{0}'")]
    UnsupportedVersion(String),

    #[error("Invalid CONNECT frame: unknown host '{0}'")]
    UnknownHost(String),

    #[error("Invalid password for user: {0}")]
    WrongPassword(String),

    #[error("User is already logged in: {0}")]
    AlreadyActive(String),

    #[error("Client must CONNECT before sending {0}")]
    NotConnected(String),

    #[error("Client is already connected")]
    AlreadyConnected,

    #[error("Client not subscribed to topic {0}")]
    NotSubscribed(String),

    #[error("Invalid subscription ID or topic not found: {0}")]
    UnknownSubscription(String),

    /// The payload is logged server side only.
    #[error("Internal server error")]
    Internal(String),
}

impl StompError {
    /// Returns true when the codec consumed a frame it could not hand over as text.
    /// Such frames are answered with ERROR like any other malformed frame.
    pub fn is_frame_error(&self) -> bool {
        matches!(self, StompError::InvalidUtf8 | StompError::FrameTooLarge(_))
    }


    /// Returns true for transport-level failures that are a normal way for a peer to leave.
    pub fn is_normal_disconnect(&self) -> bool {
        matches!(self, StompError::Io(err) if matches!(
            err.kind(),
            std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::UnexpectedEof
                | std::io::ErrorKind::ConnectionAborted
        ))
    }
}

impl PartialEq for StompError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (StompError::Io(e1), StompError::Io(e2)) => e1.kind() == e2.kind(),
            (StompError::FrameTooLarge(a), StompError::FrameTooLarge(b)) => a == b,
            (StompError::UnknownCommand(a), StompError::UnknownCommand(b)) => a == b,
            (StompError::MalformedHeader(a), StompError::MalformedHeader(b)) => a == b,
            (StompError::MissingHeader(a), StompError::MissingHeader(b)) => a == b,
            (StompError::UnsupportedVersion(a), StompError::UnsupportedVersion(b)) => a == b,
            (StompError::UnknownHost(a), StompError::UnknownHost(b)) => a == b,
            (StompError::WrongPassword(a), StompError::WrongPassword(b)) => a == b,
            (StompError::AlreadyActive(a), StompError::AlreadyActive(b)) => a == b,
            (StompError::NotConnected(a), StompError::NotConnected(b)) => a == b,
            (StompError::NotSubscribed(a), StompError::NotSubscribed(b)) => a == b,
            (StompError::UnknownSubscription(a), StompError::UnknownSubscription(b)) => a == b,
            (StompError::Internal(a), StompError::Internal(b)) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl From<std::io::Error> for StompError {
    fn from(e: std::io::Error) -> Self {
        StompError::Io(Arc::new(e))
    }
}

impl From<std::str::Utf8Error> for StompError {
    fn from(_: std::str::Utf8Error) -> Self {
        StompError::InvalidUtf8
    }
}
