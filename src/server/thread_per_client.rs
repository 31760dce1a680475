// src/server/thread_per_client.rs

//! The thread-per-connection server: every accepted socket gets its own OS thread.

use crate::connection::BlockingConnection;
use crate::core::state::ServerState;
use anyhow::Result;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread;
use tracing::{error, info, warn};

pub struct ThreadPerClientServer {
    listener: TcpListener,
    state: Arc<ServerState>,
}

impl ThreadPerClientServer {
    pub fn bind(addr: impl std::net::ToSocketAddrs, state: Arc<ServerState>) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self { listener, state })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections forever, one dedicated thread each.
    pub fn serve(self) -> Result<()> {
        info!(
            "Thread-per-client server listening on {}",
            self.listener.local_addr()?
        );
        loop {
            let (socket, addr) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            };
            let connection_id = self.state.next_connection_id();
            info!(
                "Accepted new connection {} from: {}",
                connection_id, addr
            );

            let state = self.state.clone();
            let spawned = thread::Builder::new()
                .name(format!("stomphub-conn-{connection_id}"))
                .spawn(move || {
                    let connection = BlockingConnection::new(socket, addr, connection_id, state);
                    if let Err(e) = connection.run()
                        && !e.is_normal_disconnect()
                    {
                        warn!("Connection from {} terminated unexpectedly: {}", addr, e);
                    }
                });
            if let Err(e) = spawned {
                error!("Failed to spawn thread for {}: {}", addr, e);
            }
        }
    }
}
