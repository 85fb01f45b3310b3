//! Per-connection request handling
//!
//! A connection answers `Broadcast` and `Stats` requests until the peer
//! closes it, goes idle, or sends `Subscribe`. A subscribing connection
//! becomes a [`SubscriptionSession`] whose sink writes `Event` frames; a
//! watcher task reads the other half and cancels the session on EOF.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use crate::artifact::UpdateEvent;
use crate::error::{self, ProtocolError, SinkError};
use crate::hub::BroadcastHub;
use crate::protocol::{write_frame, FrameReader, Request, Response, StatsSnapshot};
use crate::session::{LivenessRecorder, SubscribeRequest, SubscriptionSession, UpdateSink};

use super::config::ServerConfig;

/// Writes delivered updates to a subscriber socket
struct FrameSink {
    writer: OwnedWriteHalf,
}

#[async_trait]
impl UpdateSink for FrameSink {
    async fn send(&mut self, event: &Arc<UpdateEvent>) -> Result<(), SinkError> {
        let frame = Response::event_frame(event).map_err(into_sink_error)?;
        write_frame(&mut self.writer, &frame)
            .await
            .map_err(into_sink_error)
    }
}

fn into_sink_error(e: ProtocolError) -> SinkError {
    match e {
        ProtocolError::Io(e) => SinkError::Io(e),
        other => SinkError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            other,
        )),
    }
}

pub(crate) struct Connection {
    session_id: u64,
    peer_addr: SocketAddr,
    config: ServerConfig,
    hub: Arc<BroadcastHub>,
    liveness: Option<Arc<dyn LivenessRecorder>>,
    shutdown: CancellationToken,
}

impl Connection {
    pub(crate) fn new(
        session_id: u64,
        peer_addr: SocketAddr,
        config: ServerConfig,
        hub: Arc<BroadcastHub>,
        liveness: Option<Arc<dyn LivenessRecorder>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            session_id,
            peer_addr,
            config,
            hub,
            liveness,
            shutdown,
        }
    }

    pub(crate) async fn run(self, socket: TcpStream) -> error::Result<()> {
        let (read_half, mut writer) = socket.into_split();
        let mut reader = FrameReader::new(read_half, self.config.max_body_size);

        loop {
            let read = tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(()),
                read = tokio::time::timeout(self.config.request_timeout, reader.read_frame()) => read,
            };

            let frame = match read {
                Err(_) => {
                    tracing::debug!(session_id = self.session_id, "Connection idle, closing");
                    return Ok(());
                }
                Ok(Ok(Some(frame))) => frame,
                Ok(Ok(None)) => return Ok(()),
                Ok(Err(e)) => return Err(reject(&mut writer, e).await.into()),
            };

            let request = match Request::from_frame(frame) {
                Ok(request) => request,
                Err(e) => return Err(reject(&mut writer, e).await.into()),
            };

            match request {
                Request::Broadcast(event) => {
                    tracing::debug!(
                        session_id = self.session_id,
                        artifact = %event.name,
                        version = %event.version,
                        "Broadcast received"
                    );
                    let report = self.hub.broadcast(event).await;
                    respond(&mut writer, Response::BroadcastAccepted(report)).await?;
                }
                Request::Stats => {
                    let snapshot = StatsSnapshot {
                        active_subscribers: self.hub.active_count().await,
                        subscribers: self.hub.list_subscribers().await,
                        hub: self.hub.stats().await,
                    };
                    respond(&mut writer, Response::Stats(snapshot)).await?;
                }
                Request::Subscribe(request) => {
                    return self.subscribe(request, reader, writer).await;
                }
            }
        }
    }

    async fn subscribe(
        self,
        request: SubscribeRequest,
        mut reader: FrameReader<OwnedReadHalf>,
        mut writer: OwnedWriteHalf,
    ) -> error::Result<()> {
        let cancel = self.shutdown.child_token();
        let mut session = SubscriptionSession::new(Arc::clone(&self.hub), request)
            .with_cancellation(cancel.clone());
        if let Some(recorder) = self.liveness {
            session = session.with_liveness(recorder);
        }

        let registration = match session.register().await {
            Ok(registration) => registration,
            Err(e) => {
                respond(&mut writer, Response::Error(e.to_string())).await?;
                return Ok(());
            }
        };

        tracing::info!(
            session_id = self.session_id,
            peer = %self.peer_addr,
            subscriber = %registration.subscriber_id(),
            "Remote subscriber attached"
        );

        // Subscribers only listen: anything other than EOF is ignored
        let session_id = self.session_id;
        let watcher_cancel = cancel.clone();
        let watcher = tokio::spawn(async move {
            loop {
                match reader.read_frame().await {
                    Ok(Some(frame)) => {
                        tracing::debug!(
                            session_id = session_id,
                            kind = ?frame.kind,
                            "Ignoring frame on subscriber stream"
                        );
                    }
                    Ok(None) | Err(_) => break,
                }
            }
            watcher_cancel.cancel();
        });

        let mut sink = FrameSink { writer };
        let result = session.drive(registration, &mut sink).await;

        cancel.cancel();
        watcher.abort();

        match result {
            Ok(summary) => {
                tracing::debug!(
                    session_id = self.session_id,
                    subscriber = %summary.subscriber_id,
                    end = ?summary.end,
                    delivered = summary.stats.delivered,
                    "Remote subscriber detached"
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

async fn respond(
    writer: &mut OwnedWriteHalf,
    response: Response,
) -> Result<(), ProtocolError> {
    write_frame(writer, &response.to_frame()?).await
}

/// Tell the peer why the connection is closing; returns the original error
async fn reject(writer: &mut OwnedWriteHalf, err: ProtocolError) -> ProtocolError {
    if let ProtocolError::Io(_) = err {
        return err;
    }

    if let Err(e) = respond(writer, Response::Error(err.to_string())).await {
        tracing::debug!(error = %e, "Failed to send error frame");
    }
    err
}
