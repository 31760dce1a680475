// src/core/state/directory.rs

//! Contains the credential registry and active-session bookkeeping.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// The result of a login attempt against the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The credentials were accepted and the connection is now the user's active session.
    Accepted,
    /// The username is known and the password does not match.
    WrongPassword,
    /// The username is already bound to another live connection.
    AlreadyActive,
}

/// The authoritative source for credentials and active users, shared by every connection.
///
/// Single-key reads go straight to the concurrent maps. Every mutation of the
/// active-user maps runs under `login_lock`, so the
/// "known? -> password matches? -> not active? -> mark active" sequence of a
/// login can never interleave with another login for the same user.
#[derive(Debug)]
pub struct ClientDirectory {
    /// username -> password. Entries live for the whole process.
    credentials: DashMap<String, String>,
    /// connection id -> username of the session it holds.
    active_by_connection: DashMap<u64, String>,
    /// username -> connection id holding it.
    active_by_user: DashMap<String, u64>,
    login_lock: Mutex<()>,
    message_ids: AtomicU64,
    subscription_sequence: AtomicU64,
}

impl Default for ClientDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientDirectory {
    pub fn new() -> Self {
        Self {
            credentials: DashMap::new(),
            active_by_connection: DashMap::new(),
            active_by_user: DashMap::new(),
            login_lock: Mutex::new(()),
            message_ids: AtomicU64::new(1),
            subscription_sequence: AtomicU64::new(1),
        }
    }

    /// Registers a new user or validates a known one, then marks `connection_id`
    /// as that user's active session.
    ///
    /// Unknown usernames are stored with the given password and accepted. On any
    /// failure the credential store and active maps are left untouched.
    pub fn register_or_validate(
        &self,
        connection_id: u64,
        username: &str,
        password: &str,
    ) -> LoginOutcome {
        let _guard = self.login_lock.lock();

        // The read guard is dropped before any insert into the same map.
        let password_matches = self.credentials.get(username).map(|p| p.value() == password);
        match password_matches {
            Some(false) => return LoginOutcome::WrongPassword,
            Some(true) => {
                if let Some(holder) = self.active_by_user.get(username)
                    && *holder != connection_id
                {
                    return LoginOutcome::AlreadyActive;
                }
            }
            None => {
                self.credentials
                    .insert(username.to_string(), password.to_string());
                debug!("Registered new user '{}'.", username);
            }
        }

        self.mark_active_locked(connection_id, username);
        LoginOutcome::Accepted
    }

    /// Binds `username` to `connection_id`. Calling it twice is harmless.
    pub fn mark_active(&self, connection_id: u64, username: &str) {
        let _guard = self.login_lock.lock();
        self.mark_active_locked(connection_id, username);
    }

    fn mark_active_locked(&self, connection_id: u64, username: &str) {
        if let Some(previous) = self
            .active_by_connection
            .insert(connection_id, username.to_string())
            && previous != username
        {
            self.active_by_user
                .remove_if(&previous, |_, holder| *holder == connection_id);
        }
        self.active_by_user
            .insert(username.to_string(), connection_id);
    }

    /// Releases whatever user `connection_id` held. Calling it twice is harmless.
    pub fn clear_active(&self, connection_id: u64) -> Option<String> {
        let _guard = self.login_lock.lock();
        let (_, username) = self.active_by_connection.remove(&connection_id)?;
        self.active_by_user
            .remove_if(&username, |_, holder| *holder == connection_id);
        Some(username)
    }

    pub fn active_user(&self, connection_id: u64) -> Option<String> {
        self.active_by_connection
            .get(&connection_id)
            .map(|u| u.value().clone())
    }

    pub fn is_user_active(&self, username: &str) -> bool {
        self.active_by_user.contains_key(username)
    }

    pub fn is_registered(&self, username: &str) -> bool {
        self.credentials.contains_key(username)
    }

    pub fn active_count(&self) -> usize {
        self.active_by_connection.len()
    }

    /// Allocates the next process-wide message id.
    pub fn next_message_id(&self) -> String {
        self.message_ids.fetch_add(1, Ordering::Relaxed).to_string()
    }

    /// Allocates the next process-wide subscription sequence number.
    pub fn next_subscription_sequence(&self) -> String {
        self.subscription_sequence
            .fetch_add(1, Ordering::Relaxed)
            .to_string()
    }
}
