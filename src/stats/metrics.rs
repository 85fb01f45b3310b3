//! Statistics for the hub and subscriber sessions

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Hub-wide counters, updated lock-free on every broadcast
#[derive(Debug, Default)]
pub(crate) struct HubCounters {
    broadcasts: AtomicU64,
    enqueued: AtomicU64,
    dropped: AtomicU64,
}

impl HubCounters {
    pub(crate) fn record_broadcast(&self, enqueued: usize, dropped: usize) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.enqueued.fetch_add(enqueued as u64, Ordering::Relaxed);
        self.dropped.fetch_add(dropped as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, active_subscribers: usize) -> HubStats {
        HubStats {
            active_subscribers,
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            events_enqueued: self.enqueued.load(Ordering::Relaxed),
            events_dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time hub statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubStats {
    /// Current registrations
    pub active_subscribers: usize,
    /// Broadcast calls since start
    pub broadcasts: u64,
    /// Events placed on subscriber queues
    pub events_enqueued: u64,
    /// Events lost to full queues
    pub events_dropped: u64,
}

/// Per-session statistics
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// Events handed to the subscriber transport
    pub delivered: u64,
    /// Events skipped by the allow-list
    pub filtered: u64,
    /// When the session started
    pub started_at: Instant,
    /// Session length, fixed when the session ends
    pub duration: Duration,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            delivered: 0,
            filtered: 0,
            started_at: Instant::now(),
            duration: Duration::ZERO,
        }
    }

    /// Freeze the session duration
    pub fn finish(&mut self) {
        self.duration = self.started_at.elapsed();
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}
