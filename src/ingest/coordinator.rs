//! Ingestion coordinator

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;

use crate::artifact::{ArtifactKey, ArtifactMetadata, UpdateEvent};
use crate::blob::{BlobPath, BlobStore};
use crate::error::{IngestError, VerificationFailure};
use crate::metadata::{MetadataStore, MetadataTransaction};
use crate::propagation::UpdatePropagator;

use super::checksum::sha256_hex;
use super::config::IngestConfig;
use super::lock::UploadLock;

/// Admits, stores, verifies, commits and announces artifact versions
pub struct IngestCoordinator {
    blob: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    propagator: Arc<dyn UpdatePropagator>,
    config: IngestConfig,
}

impl IngestCoordinator {
    pub fn new(
        blob: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        propagator: Arc<dyn UpdatePropagator>,
    ) -> Self {
        Self::with_config(blob, metadata, propagator, IngestConfig::default())
    }

    pub fn with_config(
        blob: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        propagator: Arc<dyn UpdatePropagator>,
        config: IngestConfig,
    ) -> Self {
        Self {
            blob,
            metadata,
            propagator,
            config,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn blob_store(&self) -> &Arc<dyn BlobStore> {
        &self.blob
    }

    pub fn metadata_store(&self) -> &Arc<dyn MetadataStore> {
        &self.metadata
    }

    /// Ingest one artifact version
    ///
    /// On success the payload is stored, verified, and recorded as the
    /// latest version of `name`, and subscribers have been offered the
    /// update. On any error nothing is visible to readers.
    pub async fn ingest(
        &self,
        name: &str,
        version: &str,
        payload: Bytes,
    ) -> Result<ArtifactMetadata, IngestError> {
        let key = ArtifactKey::new(name, version)?;

        let lock =
            UploadLock::acquire(Arc::clone(&self.metadata), &key, self.config.lock_ttl).await?;
        let result = self.ingest_locked(&key, payload).await;
        lock.release().await;

        if let Err(ref e) = result {
            tracing::warn!(artifact = %key, error = %e, "Ingestion failed");
        }
        result
    }

    async fn ingest_locked(
        &self,
        key: &ArtifactKey,
        payload: Bytes,
    ) -> Result<ArtifactMetadata, IngestError> {
        let size = payload.len() as u64;

        let (checksum, saved) = tokio::join!(
            checksum(payload.clone()),
            self.blob.save(key, payload.clone())
        );
        let path = saved.map_err(IngestError::Storage)?;

        if let Err(failure) = self.verify(&path, size, &checksum).await {
            self.discard(key, &path).await;
            return Err(IngestError::Verification(failure));
        }

        let metadata = ArtifactMetadata {
            name: key.name.clone(),
            version: key.version.clone(),
            checksum,
            size,
            path,
            uploaded_at: Utc::now(),
        };

        if let Err(e) = self
            .metadata
            .commit(MetadataTransaction::for_artifact(&metadata))
            .await
        {
            self.discard(key, &metadata.path).await;
            return Err(IngestError::Metadata(e));
        }

        tracing::info!(
            artifact = %key,
            checksum = %metadata.checksum,
            size = metadata.size,
            "Artifact committed"
        );

        self.propagate(UpdateEvent::committed(&metadata, payload))
            .await;

        Ok(metadata)
    }

    /// Read back the stored bytes and compare against the upload
    async fn verify(
        &self,
        path: &BlobPath,
        expected_size: u64,
        expected_checksum: &str,
    ) -> Result<(), VerificationFailure> {
        let stored = self
            .blob
            .get(path)
            .await
            .map_err(VerificationFailure::Unreadable)?;

        let actual_size = stored.len() as u64;
        if actual_size != expected_size {
            return Err(VerificationFailure::SizeMismatch {
                expected: expected_size,
                actual: actual_size,
            });
        }

        let actual = checksum(stored).await;
        if actual != expected_checksum {
            return Err(VerificationFailure::ChecksumMismatch {
                expected: expected_checksum.to_string(),
                actual,
            });
        }

        Ok(())
    }

    /// Best-effort rollback of a written blob
    async fn discard(&self, key: &ArtifactKey, path: &BlobPath) {
        if let Err(e) = self.blob.delete(path).await {
            tracing::warn!(
                artifact = %key,
                path = %path,
                error = %e,
                "Failed to roll back stored artifact"
            );
        }
    }

    /// Offer the update to subscribers; failures never fail the ingestion
    async fn propagate(&self, event: UpdateEvent) {
        let name = event.name.clone();
        let version = event.version.clone();

        match self.propagator.propagate(event).await {
            Ok(report) => {
                tracing::debug!(
                    artifact = %name,
                    version = %version,
                    delivered = report.delivered,
                    dropped = report.dropped.len(),
                    "Update propagated"
                );
            }
            Err(e) => {
                tracing::warn!(
                    artifact = %name,
                    version = %version,
                    error = %e,
                    "Update propagation failed"
                );
            }
        }
    }
}

/// Hash off the async workers
async fn checksum(data: Bytes) -> String {
    let input = data.clone();

    match tokio::task::spawn_blocking(move || sha256_hex(&input)).await {
        Ok(sum) => sum,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        // Blocking pool shut down
        Err(_) => sha256_hex(&data),
    }
}
