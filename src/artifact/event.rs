//! Update events fanned out to subscribers

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::blob::BlobPath;

use super::metadata::ArtifactMetadata;

/// A committed artifact version, as announced to subscribers
///
/// Produced once per successful ingestion. The hub wraps it in an `Arc`
/// before fan-out, so every subscriber sees the same immutable value and
/// the payload `Bytes` is shared rather than copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateEvent {
    pub name: String,
    pub version: String,
    pub checksum: String,
    pub size: u64,
    pub path: BlobPath,
    /// Artifact bytes (zero-copy via reference counting)
    pub payload: Bytes,
    pub timestamp: DateTime<Utc>,
}

impl UpdateEvent {
    /// Build the event for freshly committed metadata
    pub fn committed(metadata: &ArtifactMetadata, payload: Bytes) -> Self {
        Self {
            name: metadata.name.clone(),
            version: metadata.version.clone(),
            checksum: metadata.checksum.clone(),
            size: metadata.size,
            path: metadata.path.clone(),
            payload,
            timestamp: metadata.uploaded_at,
        }
    }
}
