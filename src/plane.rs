//! Colocated assembly
//!
//! [`ControlPlane`] wires one blob store, one metadata store and one hub
//! into a coordinator that propagates in process, a catalog, and a
//! subscription service. Use [`ControlPlane::bridge_server`] to also expose
//! the hub to other processes.

use std::sync::Arc;

use bytes::Bytes;

use crate::artifact::ArtifactMetadata;
use crate::blob::{BlobStore, FsBlobStore, MemoryBlobStore};
use crate::catalog::Catalog;
use crate::config::ControlPlaneConfig;
use crate::error::{IngestError, Result, StreamError};
use crate::hub::{BroadcastHub, HubConfig};
use crate::ingest::{IngestConfig, IngestCoordinator};
use crate::metadata::{MemoryMetadataStore, MetadataStore};
use crate::propagation::LocalPropagator;
use crate::server::{BridgeServer, ServerConfig};
use crate::session::{MetadataLiveness, SubscribeRequest, Subscription, SubscriptionService};

/// Every component of a single-process deployment
pub struct ControlPlane {
    hub: Arc<BroadcastHub>,
    metadata: Arc<dyn MetadataStore>,
    coordinator: Arc<IngestCoordinator>,
    catalog: Catalog,
    subscriptions: SubscriptionService,
}

impl ControlPlane {
    pub fn new(blob: Arc<dyn BlobStore>, metadata: Arc<dyn MetadataStore>) -> Self {
        Self::with_config(blob, metadata, HubConfig::default(), IngestConfig::default())
    }

    pub fn with_config(
        blob: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        hub_config: HubConfig,
        ingest_config: IngestConfig,
    ) -> Self {
        let hub = Arc::new(BroadcastHub::with_config(hub_config));

        let coordinator = Arc::new(IngestCoordinator::with_config(
            Arc::clone(&blob),
            Arc::clone(&metadata),
            Arc::new(LocalPropagator::new(Arc::clone(&hub))),
            ingest_config,
        ));
        let catalog = Catalog::new(blob, Arc::clone(&metadata));
        let subscriptions = SubscriptionService::new(Arc::clone(&hub))
            .with_liveness(Arc::new(MetadataLiveness::new(Arc::clone(&metadata))));

        Self {
            hub,
            metadata,
            coordinator,
            catalog,
            subscriptions,
        }
    }

    /// Memory-backed stores; nothing survives the process
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryBlobStore::new()),
            Arc::new(MemoryMetadataStore::new()),
        )
    }

    /// Filesystem blobs under `config.storage_path`, metadata in memory
    pub async fn open(config: &ControlPlaneConfig) -> Result<Self> {
        let blob = FsBlobStore::open(config.storage_path.clone()).await?;

        tracing::info!(
            storage = %config.storage_path.display(),
            queue_capacity = config.hub.queue_capacity,
            "Control plane opened"
        );

        Ok(Self::with_config(
            Arc::new(blob),
            Arc::new(MemoryMetadataStore::new()),
            config.hub.clone(),
            config.ingest.clone(),
        ))
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    pub fn coordinator(&self) -> &Arc<IngestCoordinator> {
        &self.coordinator
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn subscriptions(&self) -> &SubscriptionService {
        &self.subscriptions
    }

    pub async fn ingest(
        &self,
        name: &str,
        version: &str,
        payload: Bytes,
    ) -> std::result::Result<ArtifactMetadata, IngestError> {
        self.coordinator.ingest(name, version, payload).await
    }

    pub async fn subscribe(
        &self,
        request: SubscribeRequest,
    ) -> std::result::Result<Subscription, StreamError> {
        self.subscriptions.spawn(request).await
    }

    /// Bridge server in front of this plane's hub
    pub fn bridge_server(&self, config: ServerConfig) -> BridgeServer {
        BridgeServer::new(config, Arc::clone(&self.hub))
            .with_liveness(Arc::new(MetadataLiveness::new(Arc::clone(&self.metadata))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ingest_reaches_subscriber() {
        let plane = ControlPlane::in_memory();

        let mut subscription = plane
            .subscribe(SubscribeRequest::new("c1"))
            .await
            .unwrap();

        let metadata = plane
            .ingest("w1", "1.0.0", Bytes::from_static(b"hello"))
            .await
            .unwrap();

        let event = subscription.next().await.unwrap();
        assert_eq!(event.name, "w1");
        assert_eq!(event.version, "1.0.0");
        assert_eq!(event.checksum, metadata.checksum);

        let (latest, data) = plane.catalog().fetch("w1", None).await.unwrap();
        assert_eq!(latest, metadata);
        assert_eq!(data, Bytes::from_static(b"hello"));

        subscription.close().await.unwrap();
        assert_eq!(plane.hub().active_count().await, 0);
    }

    #[tokio::test]
    async fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = ControlPlaneConfig {
            storage_path: dir.path().join("files"),
            ..Default::default()
        };

        let plane = ControlPlane::open(&config).await.unwrap();
        let metadata = plane
            .ingest("w1", "1.0.0", Bytes::from_static(b"hello"))
            .await
            .unwrap();

        assert!(dir.path().join("files/w1/1.0.0").exists());
        assert_eq!(metadata.size, 5);
    }
}
