//! Subscriber entry and queue types
//!
//! This module defines the per-subscriber state stored in the hub.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::artifact::UpdateEvent;

/// Artifact-name allow-list; empty means every artifact passes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriberFilter {
    names: BTreeSet<String>,
}

impl SubscriberFilter {
    /// Filter that accepts every artifact
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter that accepts only the given artifact names
    ///
    /// Names are kept as given. An empty name never matches a real artifact,
    /// so `[""]` delivers nothing.
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }

    /// Check whether an update for `artifact` should be delivered
    pub fn allows(&self, artifact: &str) -> bool {
        self.names.is_empty() || self.names.contains(artifact)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Allow-listed names in sorted order
    pub fn to_vec(&self) -> Vec<String> {
        self.names.iter().cloned().collect()
    }
}

/// Entry for a single subscriber in the hub
#[derive(Debug)]
pub(super) struct SubscriberEntry {
    /// Sending half of the bounded queue
    pub(super) tx: mpsc::Sender<Arc<UpdateEvent>>,

    pub(super) filter: SubscriberFilter,

    /// Distinguishes successive registrations under the same ID
    pub(super) generation: u64,

    pub(super) registered_at: DateTime<Utc>,

    /// Unix milliseconds of the last liveness refresh
    last_seen_ms: AtomicI64,
}

impl SubscriberEntry {
    pub(super) fn new(
        tx: mpsc::Sender<Arc<UpdateEvent>>,
        filter: SubscriberFilter,
        generation: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            tx,
            filter,
            generation,
            registered_at: now,
            last_seen_ms: AtomicI64::new(now.timestamp_millis()),
        }
    }

    pub(super) fn touch(&self, at: DateTime<Utc>) {
        self.last_seen_ms
            .store(at.timestamp_millis(), Ordering::Relaxed);
    }

    pub(super) fn last_seen(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_seen_ms.load(Ordering::Relaxed))
            .unwrap_or(self.registered_at)
    }

    /// Events currently waiting in the queue
    pub(super) fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub(super) fn info(&self, id: &str) -> SubscriberInfo {
        SubscriberInfo {
            id: id.to_string(),
            filter: self.filter.clone(),
            generation: self.generation,
            queued: self.queued(),
            capacity: self.tx.max_capacity(),
            registered_at: self.registered_at,
            last_seen: self.last_seen(),
        }
    }
}

/// Receiving side of a subscriber queue
///
/// `recv` returns `None` once the registration is removed from the hub
/// (or replaced by a newer one under the same ID).
#[derive(Debug)]
pub struct QueueHandle {
    subscriber_id: String,
    generation: u64,
    rx: mpsc::Receiver<Arc<UpdateEvent>>,
}

impl QueueHandle {
    pub(super) fn new(
        subscriber_id: String,
        generation: u64,
        rx: mpsc::Receiver<Arc<UpdateEvent>>,
    ) -> Self {
        Self {
            subscriber_id,
            generation,
            rx,
        }
    }

    pub fn subscriber_id(&self) -> &str {
        &self.subscriber_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for the next event; `None` means end of stream
    pub async fn recv(&mut self) -> Option<Arc<UpdateEvent>> {
        self.rx.recv().await
    }

    /// Take an event if one is already queued
    pub fn try_recv(&mut self) -> Option<Arc<UpdateEvent>> {
        self.rx.try_recv().ok()
    }
}

/// Read-only view of one registration
#[derive(Debug, Clone)]
pub struct SubscriberInfo {
    pub id: String,
    pub filter: SubscriberFilter,
    pub generation: u64,
    /// Events waiting to be drained
    pub queued: usize,
    pub capacity: usize,
    pub registered_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}
