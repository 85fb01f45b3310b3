//! Multi-key metadata transactions

use crate::artifact::ArtifactMetadata;

use super::keys;

/// One write inside a [`MetadataTransaction`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataOp {
    /// Store the metadata record for one version
    PutRecord {
        key: String,
        record: ArtifactMetadata,
    },
    /// Insert (or move) `member` in an ordered index
    IndexVersion {
        key: String,
        member: String,
        score: i64,
    },
    /// Overwrite a pointer value
    SetPointer { key: String, value: String },
}

impl MetadataOp {
    pub fn key(&self) -> &str {
        match self {
            MetadataOp::PutRecord { key, .. }
            | MetadataOp::IndexVersion { key, .. }
            | MetadataOp::SetPointer { key, .. } => key,
        }
    }
}

/// Ordered group of writes applied all-or-nothing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataTransaction {
    ops: Vec<MetadataOp>,
}

impl MetadataTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit transaction for a verified artifact: record, index entry
    /// scored by upload time, and the latest pointer.
    ///
    /// The pointer is written unconditionally; whichever commit lands last
    /// becomes latest regardless of upload timestamps.
    pub fn for_artifact(metadata: &ArtifactMetadata) -> Self {
        let key = metadata.key();

        Self::new()
            .push(MetadataOp::PutRecord {
                key: keys::record(&key),
                record: metadata.clone(),
            })
            .push(MetadataOp::IndexVersion {
                key: keys::versions(&metadata.name),
                member: metadata.version.clone(),
                score: metadata.uploaded_at.timestamp_millis(),
            })
            .push(MetadataOp::SetPointer {
                key: keys::latest(&metadata.name),
                value: metadata.version.clone(),
            })
    }

    pub fn push(mut self, op: MetadataOp) -> Self {
        self.ops.push(op);
        self
    }

    pub fn ops(&self) -> &[MetadataOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<MetadataOp> {
        self.ops
    }
}
