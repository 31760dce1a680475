// src/connection/guard.rs

//! Defines `ConnectionGuard`, an RAII guard for connection resource management.

use crate::core::state::ServerState;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

/// An RAII guard making sure a connection's shared state is purged however
/// its driver exits: DISCONNECT, protocol error, I/O failure or shutdown.
pub struct ConnectionGuard {
    /// A shared reference to the server state.
    pub(crate) state: Arc<ServerState>,
    /// The unique identifier of the connection.
    pub(crate) connection_id: u64,
    /// The network address of the client.
    pub(crate) addr: SocketAddr,
}

impl ConnectionGuard {
    /// Creates a new `ConnectionGuard`.
    pub(crate) fn new(state: Arc<ServerState>, connection_id: u64, addr: SocketAddr) -> Self {
        state.stats.increment_total_connections();
        Self {
            state,
            connection_id,
            addr,
        }
    }
}

impl Drop for ConnectionGuard {
    /// Teardown is idempotent, so this is harmless after a DISCONNECT or error
    /// already cleaned up.
    fn drop(&mut self) {
        debug!(
            "ConnectionGuard dropping, cleaning up resources for connection {} ({}).",
            self.connection_id, self.addr
        );
        self.state.teardown(self.connection_id);
    }
}
