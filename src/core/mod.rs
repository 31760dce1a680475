// src/core/mod.rs

//! The central module containing the protocol logic and shared state of StompHub.

pub mod errors;
pub mod handler;
pub mod protocol;
pub mod pubsub;
pub mod state;

pub use errors::StompError;
pub use handler::ProtocolEngine;
pub use protocol::{Command, Frame};
