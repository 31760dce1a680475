// src/core/state/core.rs

//! Defines the central `ServerState` struct, holding all shared server-wide state.

use super::connections::ConnectionRegistry;
use super::directory::ClientDirectory;
use super::stats::StatsState;
use crate::config::Config;
use crate::core::pubsub::SubscriptionBroker;
use parking_lot::{RwLock, RwLockReadGuard};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// The central struct holding all shared, server-wide state.
///
/// It is built once, wrapped in an `Arc` and handed to every protocol engine,
/// whichever concurrency model drives it. Tests build their own instance, so
/// no state leaks between them.
#[derive(Debug)]
pub struct ServerState {
    /// The server's configuration. Fixed for the lifetime of the process.
    pub config: Config,
    /// Credentials, active users and the global id counters.
    pub directory: ClientDirectory,
    /// Topic membership and per-connection subscription ids.
    pub broker: Arc<SubscriptionBroker>,
    /// Outbound handles of every live connection.
    pub connections: ConnectionRegistry,
    pub stats: StatsState,
    /// Fan-out holds this for reading, session teardown for writing, so a
    /// delivery never observes a half torn-down subscriber.
    fanout_gate: RwLock<()>,
    next_connection_id: AtomicU64,
}

impl ServerState {
    pub fn new(config: Config) -> Arc<Self> {
        let broker = Arc::new(SubscriptionBroker::new());
        Arc::new(Self {
            config,
            directory: ClientDirectory::new(),
            connections: ConnectionRegistry::new(broker.clone()),
            broker,
            stats: StatsState::new(),
            fanout_gate: RwLock::new(()),
            next_connection_id: AtomicU64::new(1),
        })
    }

    /// Hands out connection ids, unique for the lifetime of the process.
    pub fn next_connection_id(&self) -> u64 {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Held while a published message is fanned out to its subscribers.
    pub fn fanout_guard(&self) -> RwLockReadGuard<'_, ()> {
        self.fanout_gate.read()
    }

    /// Releases the user held by a connection and drops all of its subscriptions,
    /// atomically with respect to fan-out. The socket stays open.
    pub fn purge_session(&self, connection_id: u64) {
        let _gate = self.fanout_gate.write();
        if let Some(username) = self.directory.clear_active(connection_id) {
            debug!(
                "Connection {} released user '{}'.",
                connection_id, username
            );
        }
        self.broker.purge_connection(connection_id);
    }

    /// Removes the connection from the registry and closes its socket.
    pub fn close_connection(&self, connection_id: u64) {
        self.connections.disconnect(connection_id);
    }

    /// Full teardown: purge the session, then close the connection. Idempotent.
    pub fn teardown(&self, connection_id: u64) {
        self.purge_session(connection_id);
        self.close_connection(connection_id);
    }
}
