//! Committed artifact metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::blob::BlobPath;

use super::key::ArtifactKey;

/// Metadata recorded for one committed artifact version
///
/// The checksum always describes the bytes at `path`: metadata is only
/// committed after the stored blob has been read back and verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub name: String,
    pub version: String,
    /// Lowercase hex SHA-256 of the payload
    pub checksum: String,
    /// Payload size in bytes
    pub size: u64,
    /// Blob store location
    pub path: BlobPath,
    pub uploaded_at: DateTime<Utc>,
}

impl ArtifactMetadata {
    /// Key this metadata is stored under
    pub fn key(&self) -> ArtifactKey {
        ArtifactKey {
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_field_names() {
        let metadata = ArtifactMetadata {
            name: "w1".into(),
            version: "1.0.0".into(),
            checksum: "abc123".into(),
            size: 5,
            path: BlobPath::new("/files/w1/1.0.0"),
            uploaded_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        };

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["name"], "w1");
        assert_eq!(json["path"], "/files/w1/1.0.0");
        assert_eq!(json["size"], 5);

        let back: ArtifactMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, metadata);
        assert_eq!(back.key(), ArtifactKey::new("w1", "1.0.0").unwrap());
    }
}
