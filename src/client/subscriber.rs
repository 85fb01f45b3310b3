//! Remote subscription over the bridge

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::artifact::UpdateEvent;
use crate::error::{PropagationError, ProtocolError, Result};
use crate::protocol::{write_frame, FrameReader, Request, Response};
use crate::session::SubscribeRequest;

use super::config::ClientConfig;
use super::connector::connect;

/// Stream of updates from a remote hub
///
/// The hub registers the subscriber when `Subscribe` arrives and removes it
/// when this value is dropped (the connection closes). Events published
/// while disconnected are not replayed.
pub struct RemoteSubscription {
    subscriber_id: String,
    reader: FrameReader<OwnedReadHalf>,
    // Dropping the write half would signal EOF and end the session
    _writer: OwnedWriteHalf,
}

impl RemoteSubscription {
    /// Connect and subscribe
    pub async fn connect(config: &ClientConfig, request: SubscribeRequest) -> Result<Self> {
        request.validate().map_err(crate::error::StreamError::from)?;

        let stream = connect(config).await?;
        let (read_half, mut write_half) = stream.into_split();

        let frame = Request::Subscribe(request.clone()).to_frame()?;
        write_frame(&mut write_half, &frame).await?;

        tracing::info!(
            hub = %config.hub_addr,
            subscriber = %request.subscriber_id,
            "Subscribed to hub"
        );

        Ok(Self {
            subscriber_id: request.subscriber_id,
            reader: FrameReader::new(read_half, config.max_body_size),
            _writer: write_half,
        })
    }

    pub fn subscriber_id(&self) -> &str {
        &self.subscriber_id
    }

    /// Wait for the next update; `None` once the hub ends the stream
    pub async fn next_event(&mut self) -> Result<Option<UpdateEvent>> {
        let Some(frame) = self.reader.read_frame().await? else {
            return Ok(None);
        };

        match Response::from_frame(frame)? {
            Response::Event(event) => Ok(Some(event)),
            Response::Error(message) => Err(PropagationError::Rejected(message).into()),
            other => Err(ProtocolError::UnexpectedFrame(format!(
                "{:?} on subscriber stream",
                other
            ))
            .into()),
        }
    }
}
