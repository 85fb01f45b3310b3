//! Broadcast hub for update fan-out
//!
//! The hub owns one bounded queue per subscriber and copies each committed
//! update into every queue without waiting. A full queue loses that update;
//! the broadcaster never blocks on a slow consumer, and one slow consumer
//! never delays the others.
//!
//! # Architecture
//!
//! ```text
//!                         Arc<BroadcastHub>
//!                   ┌────────────────────────────┐
//!                   │ subscribers: RwLock<Map<   │
//!                   │   id, SubscriberEntry {    │
//!                   │     tx: mpsc::Sender,      │
//!                   │     filter, generation,    │
//!                   │   }                        │
//!                   │ >>                         │
//!                   └─────────────┬──────────────┘
//!                                 │ try_send (drop on full)
//!         ┌───────────────────────┼───────────────────────┐
//!         ▼                       ▼                       ▼
//!   [Registration]          [Registration]          [Registration]
//!   queue.recv()            queue.recv()            queue.recv()
//!         │                       │                       │
//!         └──► SubscriptionSession: filter ──► UpdateSink ──► subscriber
//! ```
//!
//! Broadcasts take the read lock; registration changes take the write lock.
//! Each event is wrapped in an `Arc` once, so fan-out clones a pointer and
//! the payload `Bytes` is never copied.

pub mod config;
pub mod registration;
pub mod report;
pub mod store;
pub mod subscriber;

pub use config::HubConfig;
pub use registration::Registration;
pub use report::BroadcastReport;
pub use store::BroadcastHub;
pub use subscriber::{QueueHandle, SubscriberFilter, SubscriberInfo};
