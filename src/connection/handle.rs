// src/connection/handle.rs

//! The outbound side of a connection: a bounded queue drained by a writer
//! that belongs to that connection alone.
//!
//! Fan-out only ever enqueues, so a peer that stops reading can stall its own
//! writer but never the connection that is publishing to it.

use crate::core::state::ConnectionHandle;
use bytes::Bytes;
use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

/// Queue depth used when no explicit limit is configured.
pub const DEFAULT_OUTBOUND_QUEUE_FRAMES: usize = 1024;

/// What a `ChannelHandle` hands to the writer of its connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Frame(Bytes),
    Close,
}

/// Queues frames for the connection's writer. Sending never blocks.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    tx: mpsc::Sender<Outbound>,
}

impl ChannelHandle {
    /// Creates a handle together with the receiving end its writer drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl ConnectionHandle for ChannelHandle {
    /// A full queue means the peer stopped reading; the frame is dropped for it.
    fn send(&self, frame: Bytes) -> bool {
        match self.tx.try_send(Outbound::Frame(frame)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("Outbound queue full, dropping frame for a slow consumer.");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// If the queue is full the writer still stops once the last handle is dropped.
    fn close(&self) {
        let _ = self.tx.try_send(Outbound::Close);
    }
}

/// Drains a connection's queue into its blocking socket. Runs on a dedicated
/// thread; the socket's write timeout bounds how long a stalled peer holds it.
///
/// Shutting the socket down on exit also wakes the reader thread blocked on it.
pub fn blocking_write_loop(
    mut stream: TcpStream,
    mut rx: mpsc::Receiver<Outbound>,
    addr: SocketAddr,
) {
    while let Some(outbound) = rx.blocking_recv() {
        match outbound {
            Outbound::Frame(bytes) => {
                if let Err(e) = stream.write_all(&bytes) {
                    debug!("Write to {} failed: {}", addr, e);
                    break;
                }
            }
            Outbound::Close => break,
        }
    }
    let _ = stream.flush();
    let _ = stream.shutdown(Shutdown::Both);
}
