//! Broadcast hub implementation
//!
//! The central registry of subscriber queues and the fan-out path for
//! committed updates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};

use crate::artifact::UpdateEvent;
use crate::stats::{HubCounters, HubStats};

use super::config::HubConfig;
use super::report::BroadcastReport;
use super::subscriber::{QueueHandle, SubscriberEntry, SubscriberFilter, SubscriberInfo};

/// Registry of live subscribers and their bounded queues
///
/// Thread-safe via `RwLock`. Broadcasts and introspection share the read
/// lock; only registration changes take the write lock. `tokio`'s lock is
/// fair, so a stream of broadcasts cannot starve a pending registration.
pub struct BroadcastHub {
    /// Map of subscriber ID to entry
    subscribers: RwLock<HashMap<String, SubscriberEntry>>,

    next_generation: AtomicU64,

    counters: HubCounters,

    config: HubConfig,
}

impl BroadcastHub {
    /// Create a hub with default configuration
    pub fn new() -> Self {
        Self::with_config(HubConfig::default())
    }

    /// Create a hub with custom configuration
    pub fn with_config(config: HubConfig) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
            counters: HubCounters::default(),
            config,
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Register a subscriber and return the receiving side of its queue
    ///
    /// An existing registration under the same ID is replaced. Its queue is
    /// dropped, so whoever drains it sees end of stream; no other notice is
    /// given. Callers must use unique IDs per active session.
    pub async fn register(
        &self,
        subscriber_id: impl Into<String>,
        filter: SubscriberFilter,
    ) -> QueueHandle {
        let id = subscriber_id.into();
        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let allow_list = filter.to_vec();
        let entry = SubscriberEntry::new(tx, filter, generation);

        let mut subscribers = self.subscribers.write().await;

        if let Some(previous) = subscribers.insert(id.clone(), entry) {
            tracing::warn!(
                subscriber = %id,
                previous_generation = previous.generation,
                generation = generation,
                "Subscriber ID re-registered, previous queue discarded"
            );
        }

        tracing::info!(
            subscriber = %id,
            generation = generation,
            filter = ?allow_list,
            active = subscribers.len(),
            "Subscriber registered"
        );

        QueueHandle::new(id, generation, rx)
    }

    /// Remove a registration and close its queue
    ///
    /// Returns `false` if the ID was not registered; that is not an error.
    pub async fn unregister(&self, subscriber_id: &str) -> bool {
        let mut subscribers = self.subscribers.write().await;

        match subscribers.remove(subscriber_id) {
            Some(entry) => {
                tracing::info!(
                    subscriber = %subscriber_id,
                    generation = entry.generation,
                    active = subscribers.len(),
                    "Subscriber unregistered"
                );
                true
            }
            None => false,
        }
    }

    /// Remove a registration only if it is still the given generation
    ///
    /// Used by session guards so that a session whose ID has been taken
    /// over does not evict the newer registration.
    pub async fn unregister_generation(&self, subscriber_id: &str, generation: u64) -> bool {
        let mut subscribers = self.subscribers.write().await;
        Self::remove_generation(&mut subscribers, subscriber_id, generation)
    }

    /// Non-blocking variant of [`unregister_generation`](Self::unregister_generation)
    ///
    /// Returns `None` if the registry lock is currently held.
    pub(crate) fn try_unregister_generation(
        &self,
        subscriber_id: &str,
        generation: u64,
    ) -> Option<bool> {
        let mut subscribers = self.subscribers.try_write().ok()?;
        Some(Self::remove_generation(
            &mut subscribers,
            subscriber_id,
            generation,
        ))
    }

    fn remove_generation(
        subscribers: &mut HashMap<String, SubscriberEntry>,
        subscriber_id: &str,
        generation: u64,
    ) -> bool {
        let current = subscribers
            .get(subscriber_id)
            .is_some_and(|entry| entry.generation == generation);

        if current {
            subscribers.remove(subscriber_id);
            tracing::info!(
                subscriber = %subscriber_id,
                generation = generation,
                active = subscribers.len(),
                "Subscriber unregistered"
            );
        } else {
            tracing::debug!(
                subscriber = %subscriber_id,
                generation = generation,
                "Registration already replaced or removed"
            );
        }

        current
    }

    /// Offer an update to every registered subscriber without blocking
    ///
    /// A subscriber whose queue is full loses this update. The loss is
    /// logged once for the whole broadcast and listed in the report.
    pub async fn broadcast(&self, event: UpdateEvent) -> BroadcastReport {
        let event = Arc::new(event);
        let mut report = BroadcastReport::default();

        {
            let subscribers = self.subscribers.read().await;

            for (id, entry) in subscribers.iter() {
                match entry.tx.try_send(Arc::clone(&event)) {
                    Ok(()) => report.delivered += 1,
                    Err(TrySendError::Full(_)) => report.dropped.push(id.clone()),
                    Err(TrySendError::Closed(_)) => report.closed.push(id.clone()),
                }
            }
        }

        self.counters
            .record_broadcast(report.delivered, report.dropped.len());

        report.dropped.sort();
        report.closed.sort();

        if !report.dropped.is_empty() {
            tracing::warn!(
                artifact = %event.name,
                version = %event.version,
                dropped = report.dropped.len(),
                subscribers = ?report.dropped,
                "Subscriber queues full, update dropped"
            );
        }
        if !report.closed.is_empty() {
            tracing::debug!(
                artifact = %event.name,
                subscribers = ?report.closed,
                "Subscriber queues closed before unregister"
            );
        }

        tracing::debug!(
            artifact = %event.name,
            version = %event.version,
            delivered = report.delivered,
            "Update broadcast"
        );

        report
    }

    /// Refresh the last-seen time of a subscriber
    pub async fn touch(&self, subscriber_id: &str) -> bool {
        let subscribers = self.subscribers.read().await;

        match subscribers.get(subscriber_id) {
            Some(entry) => {
                entry.touch(Utc::now());
                true
            }
            None => false,
        }
    }

    /// Number of registered subscribers
    pub async fn active_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Registered subscriber IDs, sorted
    pub async fn list_subscribers(&self) -> Vec<String> {
        let subscribers = self.subscribers.read().await;
        let mut ids: Vec<String> = subscribers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Details of one registration
    pub async fn subscriber_info(&self, subscriber_id: &str) -> Option<SubscriberInfo> {
        let subscribers = self.subscribers.read().await;
        subscribers
            .get(subscriber_id)
            .map(|entry| entry.info(subscriber_id))
    }

    /// Snapshot of hub counters
    pub async fn stats(&self) -> HubStats {
        let active = self.active_count().await;
        self.counters.snapshot(active)
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}
