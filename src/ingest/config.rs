//! Ingestion configuration

use std::time::Duration;

/// Default upload lock TTL
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(30);

/// Ingestion coordinator configuration
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// How long an upload lock survives if its holder never releases it
    pub lock_ttl: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            lock_ttl: DEFAULT_LOCK_TTL,
        }
    }
}

impl IngestConfig {
    /// Set the upload lock TTL (minimum one millisecond)
    pub fn lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = ttl.max(Duration::from_millis(1));
        self
    }
}
