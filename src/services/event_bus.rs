//! EventBus service for topic-based event routing.
//!
//! Subscribers register an unbounded channel sender under a topic name and
//! receive every event published on that topic. Subscription identity is the
//! channel itself, so unsubscribing takes the same sender that subscribed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, RwLock};

use crate::domain::models::BusEvent;

/// Sender half registered with the bus.
pub type Subscriber = mpsc::UnboundedSender<BusEvent>;

/// Central bus routing events to per-topic subscribers.
#[derive(Default)]
pub struct EventBus {
    topics: RwLock<HashMap<String, Vec<Subscriber>>>,
    published: AtomicU64,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `sender` for `topic`. Registering the same channel twice is a no-op.
    pub async fn subscribe(&self, topic: &str, sender: Subscriber) {
        let mut topics = self.topics.write().await;
        let subscribers = topics.entry(topic.to_string()).or_default();
        if subscribers.iter().any(|s| s.same_channel(&sender)) {
            return;
        }
        subscribers.push(sender);
        tracing::debug!(topic, subscribers = subscribers.len(), "subscriber added");
    }

    /// Remove `sender` from `topic`. Unknown subscribers are ignored.
    pub async fn unsubscribe(&self, topic: &str, sender: &Subscriber) {
        let mut topics = self.topics.write().await;
        if let Some(subscribers) = topics.get_mut(topic) {
            subscribers.retain(|s| !s.same_channel(sender));
            tracing::debug!(topic, subscribers = subscribers.len(), "subscriber removed");
            if subscribers.is_empty() {
                topics.remove(topic);
            }
        }
    }

    /// Deliver `event` to every subscriber of `topic`, returning how many
    /// received it. Subscribers whose receiver is gone are pruned.
    pub async fn publish(&self, topic: &str, event: BusEvent) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);

        let mut topics = self.topics.write().await;
        let Some(subscribers) = topics.get_mut(topic) else {
            return 0;
        };

        let mut delivered = 0;
        subscribers.retain(|s| match s.send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => false,
        });
        if subscribers.is_empty() {
            topics.remove(topic);
        }
        delivered
    }

    /// Number of live subscribers on `topic`.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .await
            .get(topic)
            .map_or(0, Vec::len)
    }

    /// Total number of publish calls.
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}
