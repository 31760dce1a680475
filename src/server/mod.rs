// src/server/mod.rs

use crate::config::{Config, ServerType};
use crate::core::state::ServerState;
use anyhow::Result;
use tracing::info;

pub mod reactor;
pub mod thread_per_client;

pub use reactor::ReactorServer;
pub use thread_per_client::ThreadPerClientServer;

/// The main server startup function: builds the shared state and hands it to
/// the concurrency model selected in the configuration.
pub fn run(config: Config) -> Result<()> {
    info!(
        "Starting {} server on {}:{} (virtual host '{}').",
        config.server_type, config.host, config.port, config.virtual_host
    );
    let server_type = config.server_type;
    let state = ServerState::new(config);

    match server_type {
        ServerType::Tpc => {
            let addr = format!("{}:{}", state.config.host, state.config.port);
            ThreadPerClientServer::bind(addr, state)?.serve()
        }
        ServerType::Reactor => reactor::run(state),
    }
}
