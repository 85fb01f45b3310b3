//! Artifact key

use crate::error::InvalidInput;

/// Unique identifier for an artifact version (name + version)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactKey {
    /// Artifact name (e.g., "edge-router")
    pub name: String,
    /// Version string (e.g., "1.4.2"), opaque to the system
    pub version: String,
}

impl ArtifactKey {
    /// Create a key, rejecting an empty name or version
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Result<Self, InvalidInput> {
        let name = name.into();
        let version = version.into();

        if name.is_empty() {
            return Err(InvalidInput::required("name"));
        }
        if version.is_empty() {
            return Err(InvalidInput::required("version"));
        }

        Ok(Self { name, version })
    }
}

impl std::fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}
