//! Bridge clients
//!
//! - [`BridgeClient`]: propagates committed updates to a remote hub and
//!   queries its statistics
//! - [`RemoteSubscription`]: receives updates from a remote hub

pub mod bridge;
pub mod config;
mod connector;
pub mod subscriber;

pub use bridge::BridgeClient;
pub use config::ClientConfig;
pub use subscriber::RemoteSubscription;
