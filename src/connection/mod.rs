// src/connection/mod.rs

//! Manages the lifecycle of a single client TCP connection: reading bytes,
//! framing them, driving the protocol engine and cleaning up afterwards.

// Declare the private sub-modules of the `connection` module.
mod blocking;
mod guard;
mod handle;
mod handler;
mod session;

// Publicly re-export the primary types from the sub-modules.
pub use blocking::BlockingConnection;
pub use guard::ConnectionGuard;
pub use handle::{ChannelHandle, DEFAULT_OUTBOUND_QUEUE_FRAMES, Outbound};
pub use handler::ConnectionHandler;
pub use session::{SessionPhase, SessionState};
