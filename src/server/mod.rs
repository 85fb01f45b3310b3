//! Bridge server
//!
//! Exposes a [`BroadcastHub`](crate::hub::BroadcastHub) over TCP so the
//! ingestion coordinator and subscribers can run in other processes.

pub mod config;
mod connection;
pub mod listener;

pub use config::ServerConfig;
pub use listener::BridgeServer;
