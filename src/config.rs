//! Environment configuration
//!
//! | Variable                 | Default          | Sets                              |
//! |--------------------------|------------------|-----------------------------------|
//! | `STORAGE_PATH`           | `./files`        | filesystem blob root              |
//! | `BRIDGE_ADDR`            | `0.0.0.0:8082`   | [`ServerConfig::bind_addr`]       |
//! | `HUB_ADDR`               | `127.0.0.1:8082` | [`ClientConfig::hub_addr`]        |
//! | `HUB_QUEUE_CAPACITY`     | `100`            | [`HubConfig::queue_capacity`]     |
//! | `UPLOAD_LOCK_TTL_SECS`   | `30`             | [`IngestConfig::lock_ttl`]        |
//! | `LIVENESS_INTERVAL_SECS` | `30`             | [`HubConfig::liveness_interval`]  |
//! | `MAX_STREAMS`            | `1000`           | [`ServerConfig::max_connections`] |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::client::ClientConfig;
use crate::error::ConfigError;
use crate::hub::HubConfig;
use crate::ingest::IngestConfig;
use crate::server::ServerConfig;

/// Default filesystem blob root
pub const DEFAULT_STORAGE_PATH: &str = "./files";

/// Configuration for every component of a deployment
#[derive(Debug, Clone)]
pub struct ControlPlaneConfig {
    pub storage_path: PathBuf,
    pub hub: HubConfig,
    pub ingest: IngestConfig,
    pub server: ServerConfig,
    pub client: ClientConfig,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            hub: HubConfig::default(),
            ingest: IngestConfig::default(),
            server: ServerConfig::default(),
            client: ClientConfig::default(),
        }
    }
}

impl ControlPlaneConfig {
    /// Read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("STORAGE_PATH").filter(|p| !p.is_empty()) {
            config.storage_path = PathBuf::from(path);
        }

        if let Some(addr) = parse::<SocketAddr>(&lookup, "BRIDGE_ADDR")? {
            config.server = config.server.bind(addr);
        }

        if let Some(addr) = lookup("HUB_ADDR") {
            if addr.is_empty() {
                return Err(invalid("HUB_ADDR", &addr, "must not be empty"));
            }
            config.client.hub_addr = addr;
        }

        if let Some(capacity) = parse::<usize>(&lookup, "HUB_QUEUE_CAPACITY")? {
            if capacity == 0 {
                return Err(invalid("HUB_QUEUE_CAPACITY", "0", "must be at least 1"));
            }
            config.hub = config.hub.queue_capacity(capacity);
        }

        if let Some(secs) = parse::<u64>(&lookup, "UPLOAD_LOCK_TTL_SECS")? {
            if secs == 0 {
                return Err(invalid("UPLOAD_LOCK_TTL_SECS", "0", "must be at least 1"));
            }
            config.ingest = config.ingest.lock_ttl(Duration::from_secs(secs));
        }

        // Zero disables the refresh
        if let Some(secs) = parse::<u64>(&lookup, "LIVENESS_INTERVAL_SECS")? {
            config.hub = config.hub.liveness_interval(Duration::from_secs(secs));
        }

        if let Some(max) = parse::<usize>(&lookup, "MAX_STREAMS")? {
            config.server = config.server.max_connections(max);
        }

        Ok(config)
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| invalid(key, &value, &e.to_string())),
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ControlPlaneConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.storage_path, PathBuf::from("./files"));
        assert_eq!(config.server.bind_addr.port(), 8082);
        assert_eq!(config.server.max_connections, 1000);
        assert_eq!(config.hub.queue_capacity, 100);
        assert_eq!(config.ingest.lock_ttl, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = ControlPlaneConfig::from_lookup(lookup(&[
            ("STORAGE_PATH", "/var/lib/workers"),
            ("BRIDGE_ADDR", "127.0.0.1:9100"),
            ("HUB_ADDR", "hub.internal:9100"),
            ("HUB_QUEUE_CAPACITY", "8"),
            ("UPLOAD_LOCK_TTL_SECS", "5"),
            ("LIVENESS_INTERVAL_SECS", "0"),
            ("MAX_STREAMS", "20"),
        ]))
        .unwrap();

        assert_eq!(config.storage_path, PathBuf::from("/var/lib/workers"));
        assert_eq!(config.server.bind_addr.port(), 9100);
        assert_eq!(config.client.hub_addr, "hub.internal:9100");
        assert_eq!(config.hub.queue_capacity, 8);
        assert_eq!(config.ingest.lock_ttl, Duration::from_secs(5));
        assert_eq!(config.hub.liveness_interval, Duration::ZERO);
        assert_eq!(config.server.max_connections, 20);
    }

    #[test]
    fn test_bad_values_rejected() {
        let err = ControlPlaneConfig::from_lookup(lookup(&[("MAX_STREAMS", "lots")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, ref value, .. } if key == "MAX_STREAMS" && value == "lots"
        ));

        assert!(ControlPlaneConfig::from_lookup(lookup(&[("HUB_QUEUE_CAPACITY", "0")])).is_err());
        assert!(ControlPlaneConfig::from_lookup(lookup(&[("BRIDGE_ADDR", "nowhere")])).is_err());
        assert!(ControlPlaneConfig::from_lookup(lookup(&[("HUB_ADDR", "")])).is_err());
    }
}
