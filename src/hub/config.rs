//! Hub configuration

use std::time::Duration;

/// Default per-subscriber queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Default interval between liveness refreshes
pub const DEFAULT_LIVENESS_INTERVAL: Duration = Duration::from_secs(30);

/// Broadcast hub configuration
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Bounded queue capacity per subscriber; updates beyond it are dropped
    pub queue_capacity: usize,

    /// How often a subscriber session refreshes its last-seen timestamp
    pub liveness_interval: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            liveness_interval: DEFAULT_LIVENESS_INTERVAL,
        }
    }
}

impl HubConfig {
    /// Set the per-subscriber queue capacity (minimum 1)
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Set the liveness refresh interval
    pub fn liveness_interval(mut self, interval: Duration) -> Self {
        self.liveness_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();

        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.liveness_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_builder_queue_capacity_floor() {
        let config = HubConfig::default().queue_capacity(0);

        assert_eq!(config.queue_capacity, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let config = HubConfig::default()
            .queue_capacity(8)
            .liveness_interval(Duration::from_millis(250));

        assert_eq!(config.queue_capacity, 8);
        assert_eq!(config.liveness_interval, Duration::from_millis(250));
    }
}
