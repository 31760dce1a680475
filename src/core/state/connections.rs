// src/core/state/connections.rs

//! Contains the table of live connections and their outbound capabilities.

use crate::core::pubsub::SubscriptionBroker;
use bytes::Bytes;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// The outbound side of one client connection.
///
/// Both concurrency models hand frames to a bounded queue drained by a writer
/// of their own (a thread or a task). The protocol layer never needs to know
/// which one it is talking to.
pub trait ConnectionHandle: Send + Sync {
    /// Queues one encoded frame without blocking. Returns false if the frame
    /// was not accepted, because the peer is gone or not keeping up.
    fn send(&self, frame: Bytes) -> bool;

    /// Closes the connection once everything sent before has been flushed.
    fn close(&self);
}

/// Maps connection ids to their outbound handles.
///
/// This is the only place through which bytes reach a client socket.
pub struct ConnectionRegistry {
    handles: DashMap<u64, Arc<dyn ConnectionHandle>>,
    broker: Arc<SubscriptionBroker>,
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connections", &self.handles.len())
            .finish()
    }
}

impl ConnectionRegistry {
    pub fn new(broker: Arc<SubscriptionBroker>) -> Self {
        Self {
            handles: DashMap::new(),
            broker,
        }
    }

    /// Registers (or replaces) the handle for a connection.
    pub fn register(&self, connection_id: u64, handle: Arc<dyn ConnectionHandle>) {
        self.handles.insert(connection_id, handle);
    }

    /// Sends one encoded frame to one connection. Unknown ids yield `false`.
    pub fn send_to(&self, connection_id: u64, frame: Bytes) -> bool {
        // Clone the handle out so sending never holds a shard lock.
        let handle = self.handles.get(&connection_id).map(|h| h.value().clone());
        match handle {
            Some(handle) => handle.send(frame),
            None => false,
        }
    }

    /// Best-effort fan-out of the same bytes to every subscriber of `topic`.
    /// Returns how many connections accepted the frame.
    pub fn send_to_topic(&self, topic: &str, frame: Bytes) -> usize {
        self.broker
            .subscribers(topic)
            .into_iter()
            .filter(|id| self.send_to(*id, frame.clone()))
            .count()
    }

    /// Forgets a connection and drops it from every topic it was subscribed to.
    pub fn remove(&self, connection_id: u64) -> Option<Arc<dyn ConnectionHandle>> {
        self.broker.purge_connection(connection_id);
        self.handles.remove(&connection_id).map(|(_, handle)| handle)
    }

    /// Removes the connection and closes its socket.
    pub fn disconnect(&self, connection_id: u64) {
        if let Some(handle) = self.remove(connection_id) {
            debug!("Closing connection {}.", connection_id);
            handle.close();
        }
    }

    pub fn contains(&self, connection_id: u64) -> bool {
        self.handles.contains_key(&connection_id)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
