// src/connection/handler.rs

//! Defines the `ConnectionHandler` which drives one connection inside the reactor.

use super::guard::ConnectionGuard;
use super::handle::{ChannelHandle, Outbound};
use crate::core::protocol::StompCodec;
use crate::core::state::ServerState;
use crate::core::{ProtocolEngine, StompError};
use futures::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

/// Manages the full lifecycle of a client connection on a reactor worker.
///
/// Reads are readiness-driven through `FramedRead`; each completed frame is
/// handed to the engine synchronously, so one connection's frames are always
/// processed in order while other connections progress on other workers.
pub struct ConnectionHandler {
    addr: SocketAddr,
    state: Arc<ServerState>,
    connection_id: u64,
    shutdown_rx: broadcast::Receiver<()>,
}

impl ConnectionHandler {
    /// Creates a new `ConnectionHandler`.
    pub fn new(
        addr: SocketAddr,
        state: Arc<ServerState>,
        connection_id: u64,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            addr,
            state,
            connection_id,
            shutdown_rx,
        }
    }

    /// The main event loop for the connection, handling incoming frames and signals.
    pub async fn run(&mut self, socket: TcpStream) -> Result<(), StompError> {
        let guard = ConnectionGuard::new(self.state.clone(), self.connection_id, self.addr);
        let (read_half, write_half) = socket.into_split();
        let (handle, outbound_rx) = ChannelHandle::channel(self.state.config.outbound_queue_frames);
        let mut writer = tokio::spawn(write_loop(
            write_half,
            outbound_rx,
            self.addr,
            self.state.config.write_timeout(),
        ));
        let mut writer_finished = false;

        let mut engine =
            ProtocolEngine::new(self.connection_id, Arc::new(handle), self.state.clone());
        let mut frames = FramedRead::new(
            read_half,
            StompCodec::new(self.state.config.max_frame_bytes),
        );

        let result = loop {
            tokio::select! {
                // Prioritize shutdown signals over other events.
                biased;
                _ = self.shutdown_rx.recv() => {
                    info!("Connection handler for {} received shutdown signal.", self.addr);
                    break Ok(());
                }
                next = frames.next() => {
                    match next {
                        Some(Ok(raw)) => {
                            engine.process(&raw);
                            if engine.should_terminate() {
                                break Ok(());
                            }
                        }
                        Some(Err(e)) if e.is_frame_error() => {
                            warn!("Rejecting frame from {}: {}", self.addr, e);
                            engine.reject(e);
                            break Ok(());
                        }
                        Some(Err(e)) => {
                            if e.is_normal_disconnect() {
                                debug!("Connection from {} closed by peer: {}", self.addr, e);
                                break Ok(());
                            }
                            warn!("Connection error for {}: {}", self.addr, e);
                            break Err(e);
                        }
                        None => {
                            debug!("Connection from {} closed by peer.", self.addr);
                            break Ok(());
                        }
                    }
                }
                // The writer only stops early when the peer stopped reading.
                res = &mut writer, if !writer_finished => {
                    writer_finished = true;
                    if let Err(e) = res {
                        warn!("Writer task for {} failed: {}", self.addr, e);
                    }
                    debug!("Writer for {} gave up, closing the connection.", self.addr);
                    break Ok(());
                }
            }
        };

        // Teardown drops the registry's handle, which lets the writer drain and exit.
        drop(engine);
        drop(guard);
        if !writer_finished && let Err(e) = writer.await {
            warn!("Writer task for {} failed: {}", self.addr, e);
        }
        result
    }
}

/// Drains queued frames into the socket until told to close, every handle is
/// gone, or a single write stalls past `write_timeout`.
async fn write_loop(
    mut socket: OwnedWriteHalf,
    mut rx: mpsc::Receiver<Outbound>,
    addr: SocketAddr,
    write_timeout: Duration,
) {
    while let Some(outbound) = rx.recv().await {
        match outbound {
            Outbound::Frame(bytes) => match timeout(write_timeout, socket.write_all(&bytes)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    debug!("Write to {} failed: {}", addr, e);
                    break;
                }
                Err(_) => {
                    warn!("Write to {} timed out, peer is not reading.", addr);
                    break;
                }
            },
            Outbound::Close => break,
        }
    }
    let _ = socket.shutdown().await;
}
