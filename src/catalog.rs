//! Read-side queries over committed artifacts

use std::sync::Arc;

use bytes::Bytes;

use crate::artifact::{ArtifactKey, ArtifactMetadata};
use crate::blob::{BlobError, BlobStore};
use crate::error::{CatalogError, InvalidInput};
use crate::metadata::MetadataStore;

/// Consumer-facing view of stored artifacts
#[derive(Clone)]
pub struct Catalog {
    blob: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
}

impl Catalog {
    pub fn new(blob: Arc<dyn BlobStore>, metadata: Arc<dyn MetadataStore>) -> Self {
        Self { blob, metadata }
    }

    /// Metadata for one version
    pub async fn metadata(
        &self,
        name: &str,
        version: &str,
    ) -> Result<ArtifactMetadata, CatalogError> {
        let key = ArtifactKey::new(name, version)?;

        self.metadata
            .read_record(&key)
            .await?
            .ok_or_else(|| CatalogError::NotFound(key.to_string()))
    }

    /// Metadata for the version the latest pointer names
    pub async fn latest(&self, name: &str) -> Result<ArtifactMetadata, CatalogError> {
        if name.is_empty() {
            return Err(InvalidInput::required("name").into());
        }

        let version = self
            .metadata
            .read_latest_pointer(name)
            .await?
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))?;

        self.metadata(name, &version).await
    }

    /// Versions of `name`, newest first; empty if none were ever committed
    pub async fn versions(&self, name: &str) -> Result<Vec<String>, CatalogError> {
        if name.is_empty() {
            return Err(InvalidInput::required("name").into());
        }

        Ok(self.metadata.read_ordered_versions(name).await?)
    }

    /// Metadata plus stored bytes; `None` selects the latest version
    pub async fn fetch(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<(ArtifactMetadata, Bytes), CatalogError> {
        let metadata = match version {
            Some(version) => self.metadata(name, version).await?,
            None => self.latest(name).await?,
        };

        let data = match self.blob.get(&metadata.path).await {
            Ok(data) => data,
            Err(BlobError::NotFound(path)) => {
                return Err(CatalogError::NotFound(path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        Ok((metadata, data))
    }
}
