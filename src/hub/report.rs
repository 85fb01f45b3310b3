//! Broadcast outcome

use serde::{Deserialize, Serialize};

/// What happened to one broadcast
///
/// Drops are not errors: they are the expected outcome for a saturated
/// subscriber and are reported here so callers can log them in aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastReport {
    /// Number of subscriber queues the event was placed on
    pub delivered: usize,

    /// Subscribers whose queue was full (sorted)
    #[serde(default)]
    pub dropped: Vec<String>,

    /// Subscribers whose receiving side was already gone (sorted)
    #[serde(default)]
    pub closed: Vec<String>,

    /// Dropped or closed subscribers left out of the lists above
    ///
    /// Only non-zero when the report was shortened to fit a bridge frame.
    #[serde(default)]
    pub omitted: usize,
}

impl BroadcastReport {
    /// True if every registered subscriber got the event
    pub fn is_complete(&self) -> bool {
        self.dropped.is_empty() && self.closed.is_empty() && self.omitted == 0
    }

    /// Total registrations the broadcast was attempted against
    pub fn attempted(&self) -> usize {
        self.delivered + self.dropped.len() + self.closed.len() + self.omitted
    }
}
