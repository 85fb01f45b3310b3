//! Artifact identity, committed metadata, and update events
//!
//! An artifact is a named, versioned binary payload. The pair
//! `(name, version)` is the unit of uniqueness; both parts are opaque
//! strings.

pub mod event;
pub mod key;
pub mod metadata;

pub use event::UpdateEvent;
pub use key::ArtifactKey;
pub use metadata::ArtifactMetadata;
