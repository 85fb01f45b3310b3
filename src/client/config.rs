//! Bridge client configuration

use std::time::Duration;

use crate::protocol::constants::DEFAULT_MAX_BODY_SIZE;

/// Default hub address
pub const DEFAULT_HUB_ADDR: &str = "127.0.0.1:8082";

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Hub bridge address (`host:port`)
    pub hub_addr: String,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Time allowed for one request and its response
    pub request_timeout: Duration,

    /// Largest accepted frame body
    pub max_body_size: usize,

    /// Enable TCP_NODELAY
    pub tcp_nodelay: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HUB_ADDR)
    }
}

impl ClientConfig {
    /// Create a new config for the hub at `addr`
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            hub_addr: addr.into(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            tcp_nodelay: true,
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }
}
