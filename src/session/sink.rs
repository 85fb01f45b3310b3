//! Subscriber transports

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::artifact::UpdateEvent;
use crate::error::SinkError;

/// Destination of delivered updates for one subscriber
///
/// An error ends the session: the subscriber is treated as disconnected.
#[async_trait]
pub trait UpdateSink: Send {
    async fn send(&mut self, event: &Arc<UpdateEvent>) -> Result<(), SinkError>;
}

/// Sink that forwards into an in-process channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Arc<UpdateEvent>>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Arc<UpdateEvent>>) -> Self {
        Self { tx }
    }

    /// Create a sink and the receiver it feeds
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Arc<UpdateEvent>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl UpdateSink for ChannelSink {
    async fn send(&mut self, event: &Arc<UpdateEvent>) -> Result<(), SinkError> {
        self.tx
            .send(Arc::clone(event))
            .await
            .map_err(|_| SinkError::Disconnected)
    }
}
