//! Periodic liveness refresh for subscriber sessions

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::hub::BroadcastHub;
use crate::metadata::{MetadataError, MetadataStore};

/// Persists a subscriber's last-seen time
#[async_trait]
pub trait LivenessRecorder: Send + Sync {
    async fn record(&self, subscriber_id: &str, at: DateTime<Utc>) -> Result<(), MetadataError>;
}

/// Records liveness in a [`MetadataStore`]
#[derive(Clone)]
pub struct MetadataLiveness {
    store: Arc<dyn MetadataStore>,
}

impl MetadataLiveness {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LivenessRecorder for MetadataLiveness {
    async fn record(&self, subscriber_id: &str, at: DateTime<Utc>) -> Result<(), MetadataError> {
        self.store.record_last_seen(subscriber_id, at).await
    }
}

/// Spawn the refresh loop for one session
///
/// Every `interval` the hub entry is touched and, if a recorder is given,
/// the timestamp is persisted. Failures are logged and never end the
/// session. The task exits when `cancel` fires. A zero interval disables
/// the refresh and returns `None`.
pub(crate) fn spawn_liveness_task(
    hub: Arc<BroadcastHub>,
    recorder: Option<Arc<dyn LivenessRecorder>>,
    subscriber_id: String,
    interval: Duration,
    cancel: CancellationToken,
) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        return None;
    }

    Some(tokio::spawn(async move {
        let start = tokio::time::Instant::now() + interval;
        let mut ticker = tokio::time::interval_at(start, interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            hub.touch(&subscriber_id).await;

            if let Some(ref recorder) = recorder {
                if let Err(e) = recorder.record(&subscriber_id, Utc::now()).await {
                    tracing::warn!(
                        subscriber = %subscriber_id,
                        error = %e,
                        "Liveness refresh failed"
                    );
                }
            }
        }

        tracing::trace!(subscriber = %subscriber_id, "Liveness task stopped");
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::hub::SubscriberFilter;
    use crate::metadata::MemoryMetadataStore;

    struct FailingRecorder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LivenessRecorder for FailingRecorder {
        async fn record(&self, _: &str, _: DateTime<Utc>) -> Result<(), MetadataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(MetadataError::Unavailable("down".into()))
        }
    }

    #[tokio::test]
    async fn test_records_last_seen() {
        let hub = Arc::new(BroadcastHub::new());
        let store = Arc::new(MemoryMetadataStore::new());
        let _queue = hub.register("c1", SubscriberFilter::all()).await;
        let cancel = CancellationToken::new();

        let recorder: Arc<dyn LivenessRecorder> = Arc::new(MetadataLiveness::new(store.clone()));
        let task = spawn_liveness_task(
            Arc::clone(&hub),
            Some(recorder),
            "c1".into(),
            Duration::from_millis(10),
            cancel.clone(),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        task.await.unwrap();

        assert!(store.last_seen("c1").await.is_some());
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_refresh() {
        let hub = Arc::new(BroadcastHub::new());
        let recorder = Arc::new(FailingRecorder {
            calls: AtomicUsize::new(0),
        });
        let cancel = CancellationToken::new();

        let task = spawn_liveness_task(
            hub,
            Some(recorder.clone() as Arc<dyn LivenessRecorder>),
            "c1".into(),
            Duration::from_millis(5),
            cancel.clone(),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;
        cancel.cancel();
        task.await.unwrap();

        assert!(recorder.calls.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_zero_interval_disabled() {
        let hub = Arc::new(BroadcastHub::new());
        let task = spawn_liveness_task(
            hub,
            None,
            "c1".into(),
            Duration::ZERO,
            CancellationToken::new(),
        );
        assert!(task.is_none());
    }
}
