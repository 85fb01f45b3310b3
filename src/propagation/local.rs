//! Direct propagation into a colocated hub

use std::sync::Arc;

use async_trait::async_trait;

use crate::artifact::UpdateEvent;
use crate::error::PropagationError;
use crate::hub::{BroadcastHub, BroadcastReport};

use super::UpdatePropagator;

/// Propagator that calls [`BroadcastHub::broadcast`] in process
#[derive(Clone)]
pub struct LocalPropagator {
    hub: Arc<BroadcastHub>,
}

impl LocalPropagator {
    pub fn new(hub: Arc<BroadcastHub>) -> Self {
        Self { hub }
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }
}

#[async_trait]
impl UpdatePropagator for LocalPropagator {
    async fn propagate(&self, event: UpdateEvent) -> Result<BroadcastReport, PropagationError> {
        Ok(self.hub.broadcast(event).await)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use chrono::Utc;

    use super::*;
    use crate::blob::BlobPath;
    use crate::hub::SubscriberFilter;

    #[tokio::test]
    async fn test_local_propagation_reaches_hub() {
        let hub = Arc::new(BroadcastHub::new());
        let mut queue = hub.register("c1", SubscriberFilter::all()).await;
        let propagator = LocalPropagator::new(Arc::clone(&hub));

        let report = propagator
            .propagate(UpdateEvent {
                name: "w1".into(),
                version: "1.0.0".into(),
                checksum: "abc".into(),
                size: 5,
                path: BlobPath::new("mem://w1/1.0.0"),
                payload: Bytes::from_static(b"hello"),
                timestamp: Utc::now(),
            })
            .await
            .unwrap();

        assert_eq!(report.delivered, 1);
        assert!(report.is_complete());
        assert_eq!(queue.recv().await.unwrap().version, "1.0.0");
    }

    #[tokio::test]
    async fn test_empty_hub_is_not_an_error() {
        let propagator = LocalPropagator::new(Arc::new(BroadcastHub::new()));

        let report = propagator
            .propagate(UpdateEvent {
                name: "w1".into(),
                version: "1.0.0".into(),
                checksum: "abc".into(),
                size: 0,
                path: BlobPath::new("mem://w1/1.0.0"),
                payload: Bytes::new(),
                timestamp: Utc::now(),
            })
            .await
            .unwrap();

        assert_eq!(report.attempted(), 0);
    }
}
