//! Request/response client for a remote hub

use async_trait::async_trait;

use crate::artifact::UpdateEvent;
use crate::error::{PropagationError, ProtocolError};
use crate::hub::BroadcastReport;
use crate::propagation::UpdatePropagator;
use crate::protocol::{write_frame, FrameReader, Request, Response, StatsSnapshot};

use super::config::ClientConfig;
use super::connector::connect;

/// Propagates updates to a hub over the bridge
///
/// Each request uses its own connection, so a client can be shared freely
/// between concurrent ingestions.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    config: ClientConfig,
}

impl BridgeClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch the hub's statistics
    pub async fn stats(&self) -> Result<StatsSnapshot, PropagationError> {
        match self.request(&Request::Stats).await? {
            Response::Stats(snapshot) => Ok(snapshot),
            other => Err(unexpected(other)),
        }
    }

    async fn request(&self, request: &Request) -> Result<Response, PropagationError> {
        let frame = request.to_frame()?;
        frame.check_body_size(self.config.max_body_size)?;
        let stream = connect(&self.config).await?;

        let exchange = async move {
            let (read_half, mut write_half) = stream.into_split();
            write_frame(&mut write_half, &frame).await?;

            let mut reader = FrameReader::new(read_half, self.config.max_body_size);
            match reader.read_frame().await? {
                Some(frame) => Response::from_frame(frame),
                None => Err(ProtocolError::Closed),
            }
        };

        let response = tokio::time::timeout(self.config.request_timeout, exchange)
            .await
            .map_err(|_| PropagationError::Timeout(self.config.request_timeout))??;

        match response {
            Response::Error(message) => Err(PropagationError::Rejected(message)),
            response => Ok(response),
        }
    }
}

fn unexpected(response: Response) -> PropagationError {
    let kind = match response {
        Response::BroadcastAccepted(_) => "BroadcastAccepted",
        Response::Event(_) => "Event",
        Response::Stats(_) => "Stats",
        Response::Error(_) => "Error",
    };
    ProtocolError::UnexpectedFrame(format!("{} response", kind)).into()
}

#[async_trait]
impl UpdatePropagator for BridgeClient {
    async fn propagate(&self, event: UpdateEvent) -> Result<BroadcastReport, PropagationError> {
        let name = event.name.clone();
        let version = event.version.clone();

        match self.request(&Request::Broadcast(event)).await? {
            Response::BroadcastAccepted(report) => {
                tracing::debug!(
                    artifact = %name,
                    version = %version,
                    delivered = report.delivered,
                    "Hub accepted update"
                );
                Ok(report)
            }
            other => Err(unexpected(other)),
        }
    }
}
