// src/server/reactor.rs

//! The reactor server: a fixed pool of runtime workers multiplexing every connection.

use crate::connection::ConnectionHandler;
use crate::core::state::ServerState;
use anyhow::{Result, anyhow};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

pub struct ReactorServer {
    listener: TcpListener,
    state: Arc<ServerState>,
}

impl ReactorServer {
    pub async fn bind(addr: impl ToSocketAddrs, state: Arc<ServerState>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, state })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until `shutdown_tx` fires, then closes every client.
    pub async fn serve(self, shutdown_tx: broadcast::Sender<()>) {
        let mut shutdown_rx = shutdown_tx.subscribe();
        let mut client_tasks = JoinSet::new();
        info!("Reactor server listening on {:?}", self.listener.local_addr());

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    info!("Shutdown requested, no longer accepting connections.");
                    break;
                }

                res = self.listener.accept() => {
                    match res {
                        Ok((socket, addr)) => {
                            let connection_id = self.state.next_connection_id();
                            info!("Accepted new connection {} from: {}", connection_id, addr);
                            let mut handler = ConnectionHandler::new(
                                addr,
                                self.state.clone(),
                                connection_id,
                                shutdown_tx.subscribe(),
                            );
                            client_tasks.spawn(async move {
                                if let Err(e) = handler.run(socket).await {
                                    warn!("Connection from {} terminated unexpectedly: {}", addr, e);
                                }
                            });
                        }
                        Err(e) => error!("Failed to accept connection: {}", e),
                    }
                }

                Some(res) = client_tasks.join_next() => {
                    if let Err(e) = res
                        && e.is_panic()
                    {
                        error!("A client handler panicked: {e:?}");
                    }
                }
            }
        }

        while client_tasks.join_next().await.is_some() {}
        info!("All client connections closed.");
    }
}

/// Builds the bounded worker pool and runs the reactor until SIGINT or SIGTERM.
pub fn run(state: Arc<ServerState>) -> Result<()> {
    let workers = state.config.reactor_threads;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers)
        .thread_name("stomphub-reactor")
        .enable_all()
        .build()?;
    info!("Reactor started with {} worker thread(s).", workers);

    runtime.block_on(async move {
        let addr = format!("{}:{}", state.config.host, state.config.port);
        let server = ReactorServer::bind(addr, state).await?;
        let (shutdown_tx, _) = broadcast::channel(1);

        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|e| anyhow!("Failed to register SIGINT handler: {}", e))?;
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| anyhow!("Failed to register SIGTERM handler: {}", e))?;
        let signal_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = sigint.recv() => info!("SIGINT received, initiating graceful shutdown."),
                _ = sigterm.recv() => info!("SIGTERM received, initiating graceful shutdown."),
            }
            if signal_tx.send(()).is_err() {
                error!("Failed to send shutdown signal.");
            }
        });

        server.serve(shutdown_tx).await;
        Ok::<(), anyhow::Error>(())
    })
}
