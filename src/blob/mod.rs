//! Blob storage for artifact payloads
//!
//! The ingestion coordinator writes payloads through the [`BlobStore`] trait
//! and never interprets the returned [`BlobPath`]; it only hands it back to
//! `get`/`delete` and records it in metadata.
//!
//! Two implementations ship with the crate:
//!
//! - [`FsBlobStore`]: one file per version under `{root}/{name}/{version}`
//! - [`MemoryBlobStore`]: a map, for colocated setups and tests

pub mod error;
pub mod fs;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactKey;

pub use error::BlobError;
pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

/// Opaque location of a stored blob
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobPath(String);

impl BlobPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BlobPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Byte-addressable store keyed by artifact name and version
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `data` at the deterministic path for `key`, replacing any
    /// previous content, and return that path.
    async fn save(&self, key: &ArtifactKey, data: Bytes) -> Result<BlobPath, BlobError>;

    /// Read the full contents at `path`
    async fn get(&self, path: &BlobPath) -> Result<Bytes, BlobError>;

    /// Remove the blob at `path`
    async fn delete(&self, path: &BlobPath) -> Result<(), BlobError>;

    /// Path that `save` would use for `key`
    fn path_for(&self, key: &ArtifactKey) -> Result<BlobPath, BlobError>;
}
