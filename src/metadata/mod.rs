//! Metadata store contract
//!
//! The ingestion coordinator relies on three properties of the store:
//!
//! - **TTL locks**: `try_acquire_lock` is set-if-absent with expiry, so a
//!   crashed holder never wedges a key forever.
//! - **Atomic commits**: a [`MetadataTransaction`] (record write, index
//!   insert, latest-pointer write) is applied entirely or not at all.
//! - **Ordered reads**: the per-name version index is read newest first.
//!
//! ```text
//!   lock:upload:{name}:{version}   TTL sentinel
//!   file:{name}:{version}          ArtifactMetadata record
//!   file:{name}:versions           ordered index (score = upload time)
//!   file:{name}:latest             last committed version
//!   consumer:{id}:last_seen        subscriber liveness
//! ```

pub mod error;
pub mod keys;
pub mod memory;
pub mod transaction;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::artifact::{ArtifactKey, ArtifactMetadata};

pub use error::MetadataError;
pub use memory::MemoryMetadataStore;
pub use transaction::{MetadataOp, MetadataTransaction};

/// Key-value metadata store used by ingestion and the catalog
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Set `key` if absent, expiring after `ttl`. Returns `false` if held.
    async fn try_acquire_lock(&self, key: &str, ttl: Duration) -> Result<bool, MetadataError>;

    /// Delete a lock key. Releasing an absent key is not an error.
    async fn release_lock(&self, key: &str) -> Result<(), MetadataError>;

    /// Apply every operation or none of them
    async fn commit(&self, transaction: MetadataTransaction) -> Result<(), MetadataError>;

    async fn read_record(
        &self,
        key: &ArtifactKey,
    ) -> Result<Option<ArtifactMetadata>, MetadataError>;

    async fn read_latest_pointer(&self, name: &str) -> Result<Option<String>, MetadataError>;

    /// Versions of `name`, newest first
    async fn read_ordered_versions(&self, name: &str) -> Result<Vec<String>, MetadataError>;

    async fn record_last_seen(
        &self,
        subscriber_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), MetadataError>;
}
