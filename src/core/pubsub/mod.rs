// src/core/pubsub/mod.rs

//! The core publish-subscribe system.
//! It tracks which connections listen on which topics, and under which
//! client-chosen subscription id each of them does so.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// `SubscriptionBroker` is the central hub for topic membership.
///
/// Two maps are kept side by side:
/// - `topics`: topic -> set of subscribed connection ids. A topic only exists
///   while it has at least one subscriber.
/// - `subscriptions`: connection id -> (topic -> subscription id), the ids the
///   client itself chose when subscribing.
#[derive(Debug, Default)]
pub struct SubscriptionBroker {
    topics: DashMap<String, HashSet<u64>>,
    subscriptions: DashMap<u64, HashMap<String, String>>,
}

impl SubscriptionBroker {
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a connection to a topic's subscriber set, creating the topic if needed.
    pub fn subscribe(&self, topic: &str, connection_id: u64) {
        self.topics
            .entry(topic.to_string())
            .or_default()
            .insert(connection_id);
    }

    /// Removes a connection from a topic. The topic is deleted once empty.
    pub fn unsubscribe(&self, topic: &str, connection_id: u64) {
        if let Entry::Occupied(mut entry) = self.topics.entry(topic.to_string()) {
            entry.get_mut().remove(&connection_id);
            if entry.get().is_empty() {
                entry.remove();
                debug!("Topic '{}' has no subscribers left and was removed.", topic);
            }
        }
    }

    /// Records the subscription id a connection uses for a topic.
    pub fn bind(&self, connection_id: u64, topic: &str, subscription_id: &str) {
        self.subscriptions
            .entry(connection_id)
            .or_default()
            .insert(topic.to_string(), subscription_id.to_string());
    }

    /// The subscription id `connection_id` chose for `topic`, if any.
    pub fn subscription_id_for(&self, connection_id: u64, topic: &str) -> Option<String> {
        self.subscriptions
            .get(&connection_id)
            .and_then(|subs| subs.get(topic).cloned())
    }

    /// The topic a connection bound `subscription_id` to.
    pub fn topic_for(&self, connection_id: u64, subscription_id: &str) -> Option<String> {
        self.subscriptions.get(&connection_id).and_then(|subs| {
            subs.iter()
                .find(|(_, id)| id.as_str() == subscription_id)
                .map(|(topic, _)| topic.clone())
        })
    }

    /// Resolves a subscription id to a topic by scanning every connection.
    ///
    /// Ids are only unique per connection, so the first match wins. This walks
    /// every subscription in the broker.
    pub fn topic_for_subscription_id(&self, subscription_id: &str) -> Option<String> {
        self.subscriptions.iter().find_map(|entry| {
            entry
                .value()
                .iter()
                .find(|(_, id)| id.as_str() == subscription_id)
                .map(|(topic, _)| topic.clone())
        })
    }

    /// Drops the binding for `subscription_id` on one connection and returns its topic.
    ///
    /// Topic membership is left untouched; pair with [`Self::unsubscribe`].
    pub fn unbind(&self, connection_id: u64, subscription_id: &str) -> Option<String> {
        let mut subs = self.subscriptions.get_mut(&connection_id)?;
        let topic = subs
            .iter()
            .find(|(_, id)| id.as_str() == subscription_id)
            .map(|(topic, _)| topic.clone())?;
        subs.remove(&topic);
        let now_empty = subs.is_empty();
        drop(subs);
        if now_empty {
            self.subscriptions
                .remove_if(&connection_id, |_, subs| subs.is_empty());
        }
        Some(topic)
    }

    pub fn is_subscribed(&self, topic: &str, connection_id: u64) -> bool {
        self.topics
            .get(topic)
            .is_some_and(|subs| subs.contains(&connection_id))
    }

    /// A snapshot of a topic's subscribers.
    pub fn subscribers(&self, topic: &str) -> Vec<u64> {
        self.topics
            .get(topic)
            .map(|subs| subs.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Removes a connection from every topic and forgets all of its subscription ids.
    /// Returns the number of topics it was removed from.
    pub fn purge_connection(&self, connection_id: u64) -> usize {
        let mut removed_from = 0;
        self.topics.retain(|_, subs| {
            if subs.remove(&connection_id) {
                removed_from += 1;
            }
            !subs.is_empty()
        });
        self.subscriptions.remove(&connection_id);
        if removed_from > 0 {
            debug!(
                "Purged connection {} from {} topic(s).",
                connection_id, removed_from
            );
        }
        removed_from
    }

    /// Returns a list of all topics that currently have subscribers.
    pub fn get_all_topics(&self) -> Vec<String> {
        self.topics.iter().map(|e| e.key().clone()).collect()
    }

    pub fn get_subscriber_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, |subs| subs.len())
    }

    /// Number of subscription ids held by one connection.
    pub fn get_subscription_count(&self, connection_id: u64) -> usize {
        self.subscriptions
            .get(&connection_id)
            .map_or(0, |subs| subs.len())
    }
}
