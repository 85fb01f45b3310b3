//! Subscription session loop

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::StreamError;
use crate::hub::{BroadcastHub, Registration, SubscriberFilter};
use crate::stats::SessionStats;

use super::liveness::{spawn_liveness_task, LivenessRecorder};
use super::request::SubscribeRequest;
use super::sink::UpdateSink;
use super::state::SessionState;

/// Why a session ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The caller cancelled the session
    Cancelled,
    /// The hub closed the queue (unregistered or replaced)
    QueueClosed,
}

/// Result of a completed session
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub subscriber_id: String,
    pub end: SessionEnd,
    pub stats: SessionStats,
}

/// One subscriber's long-lived delivery loop
pub struct SubscriptionSession {
    hub: Arc<BroadcastHub>,
    request: SubscribeRequest,
    liveness: Option<Arc<dyn LivenessRecorder>>,
    liveness_interval: Duration,
    cancel: CancellationToken,
}

impl SubscriptionSession {
    pub fn new(hub: Arc<BroadcastHub>, request: SubscribeRequest) -> Self {
        let liveness_interval = hub.config().liveness_interval;

        Self {
            hub,
            request,
            liveness: None,
            liveness_interval,
            cancel: CancellationToken::new(),
        }
    }

    /// Persist liveness through `recorder`
    pub fn with_liveness(mut self, recorder: Arc<dyn LivenessRecorder>) -> Self {
        self.liveness = Some(recorder);
        self
    }

    /// Override the liveness interval from the hub config
    pub fn with_liveness_interval(mut self, interval: Duration) -> Self {
        self.liveness_interval = interval;
        self
    }

    /// End the session when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that cancels this session
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn request(&self) -> &SubscribeRequest {
        &self.request
    }

    /// Validate, register, and stream until the session ends
    pub async fn run<S>(self, sink: &mut S) -> Result<SessionSummary, StreamError>
    where
        S: UpdateSink + ?Sized,
    {
        let registration = self.register().await?;
        self.drive(registration, sink).await
    }

    /// Validate the request and register with the hub
    pub async fn register(&self) -> Result<Registration, StreamError> {
        self.request.validate()?;

        Ok(Registration::acquire(
            Arc::clone(&self.hub),
            self.request.subscriber_id.clone(),
            self.request.filter(),
        )
        .await)
    }

    /// Stream from an existing registration until the session ends
    ///
    /// The registration is released before this returns, whatever the
    /// outcome.
    pub async fn drive<S>(
        self,
        mut registration: Registration,
        sink: &mut S,
    ) -> Result<SessionSummary, StreamError>
    where
        S: UpdateSink + ?Sized,
    {
        let subscriber_id = registration.subscriber_id().to_string();
        let filter = self.request.filter();
        let mut state = SessionState::new(subscriber_id.clone());
        state.on_registered();

        // Child token: stops with the session, or on its own at exit
        let liveness_cancel = self.cancel.child_token();
        let _liveness_guard = liveness_cancel.clone().drop_guard();
        let _liveness = spawn_liveness_task(
            Arc::clone(&self.hub),
            self.liveness.clone(),
            subscriber_id.clone(),
            self.liveness_interval,
            liveness_cancel,
        );

        state.start_streaming();
        tracing::info!(
            subscriber = %subscriber_id,
            filter = ?filter.to_vec(),
            "Subscription streaming"
        );

        let outcome = self
            .stream(&mut registration, &filter, sink, &mut state)
            .await;

        registration.release().await;

        match outcome {
            Ok(end) => {
                state.close(Some(end));
                tracing::info!(
                    subscriber = %subscriber_id,
                    end = ?end,
                    delivered = state.stats.delivered,
                    filtered = state.stats.filtered,
                    "Subscription ended"
                );
                Ok(SessionSummary {
                    subscriber_id,
                    end,
                    stats: state.stats,
                })
            }
            Err(e) => {
                state.close(None);
                tracing::info!(
                    subscriber = %subscriber_id,
                    error = %e,
                    delivered = state.stats.delivered,
                    "Subscription failed"
                );
                Err(e)
            }
        }
    }

    async fn stream<S>(
        &self,
        registration: &mut Registration,
        filter: &SubscriberFilter,
        sink: &mut S,
        state: &mut SessionState,
    ) -> Result<SessionEnd, StreamError>
    where
        S: UpdateSink + ?Sized,
    {
        loop {
            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(SessionEnd::Cancelled),
                next = registration.recv() => match next {
                    Some(event) => event,
                    None => return Ok(SessionEnd::QueueClosed),
                },
            };

            if !filter.allows(&event.name) {
                state.on_filtered();
                continue;
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(SessionEnd::Cancelled),
                sent = sink.send(&event) => {
                    if let Err(source) = sent {
                        return Err(StreamError::Transport {
                            subscriber_id: state.subscriber_id.clone(),
                            source,
                        });
                    }
                }
            }

            state.on_delivered();
            tracing::debug!(
                subscriber = %state.subscriber_id,
                artifact = %event.name,
                version = %event.version,
                "Update delivered"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::Utc;

    use super::*;
    use crate::artifact::UpdateEvent;
    use crate::blob::BlobPath;
    use crate::error::SinkError;
    use crate::session::sink::ChannelSink;

    fn event(name: &str) -> UpdateEvent {
        UpdateEvent {
            name: name.into(),
            version: "1.0.0".into(),
            checksum: "abc".into(),
            size: 5,
            path: BlobPath::new(format!("mem://{}/1.0.0", name)),
            payload: Bytes::from_static(b"hello"),
            timestamp: Utc::now(),
        }
    }

    struct BrokenSink;

    #[async_trait]
    impl UpdateSink for BrokenSink {
        async fn send(&mut self, _: &Arc<UpdateEvent>) -> Result<(), SinkError> {
            Err(SinkError::Io(std::io::Error::from(
                std::io::ErrorKind::BrokenPipe,
            )))
        }
    }

    async fn wait_for_count(hub: &BroadcastHub, expected: usize) {
        for _ in 0..100 {
            if hub.active_count().await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("hub never reached {} subscribers", expected);
    }

    #[tokio::test]
    async fn test_empty_subscriber_id_rejected() {
        let hub = Arc::new(BroadcastHub::new());
        let (mut sink, _rx) = ChannelSink::channel(4);

        let result = SubscriptionSession::new(Arc::clone(&hub), SubscribeRequest::new(""))
            .run(&mut sink)
            .await;

        assert!(matches!(result, Err(StreamError::InvalidInput(_))));
        assert_eq!(hub.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_filter_and_cancel() {
        let hub = Arc::new(BroadcastHub::new());
        let (mut sink, mut rx) = ChannelSink::channel(16);

        let session = SubscriptionSession::new(
            Arc::clone(&hub),
            SubscribeRequest::new("c1").with_artifacts(["a"]),
        );
        let cancel = session.cancellation();
        let task = tokio::spawn(async move { session.run(&mut sink).await });

        wait_for_count(&hub, 1).await;
        for name in ["a", "b", "a", "c"] {
            hub.broadcast(event(name)).await;
        }

        assert_eq!(rx.recv().await.unwrap().name, "a");
        assert_eq!(rx.recv().await.unwrap().name, "a");

        cancel.cancel();
        let summary = task.await.unwrap().unwrap();

        assert_eq!(summary.end, SessionEnd::Cancelled);
        assert_eq!(summary.stats.delivered, 2);
        assert!(rx.try_recv().is_err());
        assert_eq!(hub.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_unregister_closes_session() {
        let hub = Arc::new(BroadcastHub::new());
        let (mut sink, _rx) = ChannelSink::channel(4);

        let session = SubscriptionSession::new(Arc::clone(&hub), SubscribeRequest::new("c1"));
        let task = tokio::spawn(async move { session.run(&mut sink).await });

        wait_for_count(&hub, 1).await;
        assert!(hub.unregister("c1").await);

        let summary = task.await.unwrap().unwrap();
        assert_eq!(summary.end, SessionEnd::QueueClosed);
    }

    #[tokio::test]
    async fn test_transport_failure_unregisters() {
        let hub = Arc::new(BroadcastHub::new());

        let session = SubscriptionSession::new(Arc::clone(&hub), SubscribeRequest::new("c1"));
        let task = tokio::spawn(async move { session.run(&mut BrokenSink).await });

        wait_for_count(&hub, 1).await;
        hub.broadcast(event("a")).await;

        let result = task.await.unwrap();
        assert!(matches!(
            result,
            Err(StreamError::Transport { ref subscriber_id, .. }) if subscriber_id == "c1"
        ));
        assert_eq!(hub.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_cancel_while_sink_blocked() {
        let hub = Arc::new(BroadcastHub::new());
        // Capacity 1 and never drained: the second delivery blocks
        let (mut sink, _rx) = ChannelSink::channel(1);

        let session = SubscriptionSession::new(Arc::clone(&hub), SubscribeRequest::new("c1"));
        let cancel = session.cancellation();
        let task = tokio::spawn(async move { session.run(&mut sink).await });

        wait_for_count(&hub, 1).await;
        hub.broadcast(event("a")).await;
        hub.broadcast(event("a")).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        cancel.cancel();
        let summary = task.await.unwrap().unwrap();

        assert_eq!(summary.end, SessionEnd::Cancelled);
        assert_eq!(summary.stats.delivered, 1);
        assert_eq!(hub.active_count().await, 0);
    }
}
