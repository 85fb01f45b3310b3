//! In-process subscription API

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::artifact::UpdateEvent;
use crate::error::StreamError;
use crate::hub::BroadcastHub;

use super::liveness::LivenessRecorder;
use super::request::SubscribeRequest;
use super::sink::{ChannelSink, UpdateSink};
use super::stream::{SessionSummary, SubscriptionSession};

/// Default buffer between a spawned session and its [`Subscription`]
pub const DEFAULT_SINK_CAPACITY: usize = 16;

/// Opens subscriber sessions against a shared hub
#[derive(Clone)]
pub struct SubscriptionService {
    hub: Arc<BroadcastHub>,
    liveness: Option<Arc<dyn LivenessRecorder>>,
    sink_capacity: usize,
}

impl SubscriptionService {
    pub fn new(hub: Arc<BroadcastHub>) -> Self {
        Self {
            hub,
            liveness: None,
            sink_capacity: DEFAULT_SINK_CAPACITY,
        }
    }

    /// Persist liveness for every session through `recorder`
    pub fn with_liveness(mut self, recorder: Arc<dyn LivenessRecorder>) -> Self {
        self.liveness = Some(recorder);
        self
    }

    /// Buffer size of subscriptions returned by [`spawn`](Self::spawn)
    pub fn with_sink_capacity(mut self, capacity: usize) -> Self {
        self.sink_capacity = capacity.max(1);
        self
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    fn session(&self, request: SubscribeRequest, cancel: CancellationToken) -> SubscriptionSession {
        let session =
            SubscriptionSession::new(Arc::clone(&self.hub), request).with_cancellation(cancel);

        match self.liveness {
            Some(ref recorder) => session.with_liveness(Arc::clone(recorder)),
            None => session,
        }
    }

    /// Run a session on the current task until it ends
    pub async fn subscribe<S>(
        &self,
        request: SubscribeRequest,
        sink: &mut S,
        cancel: CancellationToken,
    ) -> Result<SessionSummary, StreamError>
    where
        S: UpdateSink + ?Sized,
    {
        self.session(request, cancel).run(sink).await
    }

    /// Register now and stream on a background task
    ///
    /// The subscriber is registered before this returns, so any broadcast
    /// issued afterwards reaches it.
    pub async fn spawn(&self, request: SubscribeRequest) -> Result<Subscription, StreamError> {
        let cancel = CancellationToken::new();
        let session = self.session(request, cancel.clone());
        let registration = session.register().await?;
        let subscriber_id = registration.subscriber_id().to_string();

        let (mut sink, events) = ChannelSink::channel(self.sink_capacity);
        let task = tokio::spawn(async move { session.drive(registration, &mut sink).await });

        Ok(Subscription {
            subscriber_id,
            events,
            cancel,
            task: Some(task),
        })
    }
}

/// Handle to a session running in the background
///
/// Dropping the handle cancels the session.
pub struct Subscription {
    subscriber_id: String,
    events: mpsc::Receiver<Arc<UpdateEvent>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<Result<SessionSummary, StreamError>>>,
}

impl Subscription {
    pub fn subscriber_id(&self) -> &str {
        &self.subscriber_id
    }

    /// Wait for the next delivered update; `None` once the session ended
    pub async fn next(&mut self) -> Option<Arc<UpdateEvent>> {
        self.events.recv().await
    }

    /// Take an update if one is already delivered
    pub fn try_next(&mut self) -> Option<Arc<UpdateEvent>> {
        self.events.try_recv().ok()
    }

    /// Ask the session to stop without waiting
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stop the session and wait until it is unregistered
    pub async fn close(mut self) -> Result<SessionSummary, StreamError> {
        self.cancel.cancel();

        let task = match self.task.take() {
            Some(task) => task,
            None => return Err(StreamError::Task("subscription already closed".into())),
        };

        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(StreamError::Task(e.to_string())),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
