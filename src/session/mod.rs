//! Subscriber sessions
//!
//! A session registers one subscriber with the hub, drains its queue,
//! applies the artifact allow-list, and hands matching updates to an
//! [`UpdateSink`]. It ends when the caller cancels, when the hub closes the
//! queue, or when the sink reports a transport failure; the registration is
//! removed on every one of those paths.

pub mod liveness;
pub mod request;
pub mod service;
pub mod sink;
pub mod state;
pub mod stream;

pub use liveness::{LivenessRecorder, MetadataLiveness};
pub use request::SubscribeRequest;
pub use service::{Subscription, SubscriptionService};
pub use sink::{ChannelSink, UpdateSink};
pub use state::{SessionPhase, SessionState};
pub use stream::{SessionEnd, SessionSummary, SubscriptionSession};
