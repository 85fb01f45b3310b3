//! Update propagation
//!
//! Hands a committed [`UpdateEvent`] to the broadcast hub. The coordinator
//! only sees the [`UpdatePropagator`] trait, so the hub can live in the same
//! process ([`LocalPropagator`]) or behind the bridge
//! ([`BridgeClient`](crate::client::BridgeClient)) with the same contract:
//! the result reports whether the hub accepted the event for fan-out, never
//! whether any subscriber received it.

pub mod local;

use async_trait::async_trait;

use crate::artifact::UpdateEvent;
use crate::error::PropagationError;
use crate::hub::BroadcastReport;

pub use local::LocalPropagator;

/// Delivers committed updates to a broadcast hub
#[async_trait]
pub trait UpdatePropagator: Send + Sync {
    async fn propagate(&self, event: UpdateEvent) -> Result<BroadcastReport, PropagationError>;
}
