// src/connection/blocking.rs

//! The thread-per-connection driver: one OS thread reading with blocking I/O,
//! plus a writer thread draining the connection's outbound queue.

use super::guard::ConnectionGuard;
use super::handle::{ChannelHandle, blocking_write_loop};
use crate::core::protocol::StompCodec;
use crate::core::state::ServerState;
use crate::core::{ProtocolEngine, StompError};
use bytes::BytesMut;
use std::io::{ErrorKind, Read};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use tokio_util::codec::Decoder;
use tracing::{debug, warn};

const READ_CHUNK: usize = 4096;

/// Owns one accepted socket for the whole life of its dedicated thread.
pub struct BlockingConnection {
    stream: TcpStream,
    addr: SocketAddr,
    connection_id: u64,
    state: Arc<ServerState>,
}

impl BlockingConnection {
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        connection_id: u64,
        state: Arc<ServerState>,
    ) -> Self {
        Self {
            stream,
            addr,
            connection_id,
            state,
        }
    }

    /// Reads and processes frames until the session ends or the peer goes away.
    /// Blocks the calling thread for the entire session.
    pub fn run(mut self) -> Result<(), StompError> {
        let guard = ConnectionGuard::new(self.state.clone(), self.connection_id, self.addr);

        let writer_stream = self.stream.try_clone()?;
        writer_stream.set_write_timeout(Some(self.state.config.write_timeout()))?;
        let (handle, outbound_rx) = ChannelHandle::channel(self.state.config.outbound_queue_frames);
        let addr = self.addr;
        let writer = thread::Builder::new()
            .name(format!("stomphub-writer-{}", self.connection_id))
            .spawn(move || blocking_write_loop(writer_stream, outbound_rx, addr))?;

        let mut engine =
            ProtocolEngine::new(self.connection_id, Arc::new(handle), self.state.clone());
        let result = self.read_frames(&mut engine);

        // Teardown drops the registry's handle, which lets the writer drain and exit.
        drop(engine);
        drop(guard);
        if writer.join().is_err() {
            warn!("Writer thread for {} panicked.", self.addr);
        }
        result
    }

    fn read_frames(&mut self, engine: &mut ProtocolEngine) -> Result<(), StompError> {
        let mut codec = StompCodec::new(self.state.config.max_frame_bytes);
        let mut buffer = BytesMut::with_capacity(READ_CHUNK);
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            let n = match self.stream.read(&mut chunk) {
                Ok(0) => {
                    debug!("Connection from {} closed by peer.", self.addr);
                    return Ok(());
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    // The writer shutting the socket down also lands here.
                    if engine.should_terminate() {
                        return Ok(());
                    }
                    return Err(e.into());
                }
            };
            buffer.extend_from_slice(&chunk[..n]);

            loop {
                match codec.decode(&mut buffer) {
                    Ok(Some(raw)) => {
                        engine.process(&raw);
                        if engine.should_terminate() {
                            return Ok(());
                        }
                    }
                    Ok(None) => break,
                    Err(e) if e.is_frame_error() => {
                        warn!("Rejecting frame from {}: {}", self.addr, e);
                        engine.reject(e);
                        return Ok(());
                    }
                    Err(e) => return Err(e),
                }
            }
        }
    }
}
