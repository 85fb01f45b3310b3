//! Error types
//!
//! Crate-level error enums. Store-specific errors live next to their stores
//! (`blob::BlobError`, `metadata::MetadataError`) and are wrapped here.

use std::io;

use crate::artifact::ArtifactKey;
use crate::blob::BlobError;
use crate::metadata::MetadataError;

/// Result alias using the crate [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for operations that span components
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Propagation(#[from] PropagationError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] BlobError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A caller-supplied field was missing or malformed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct InvalidInput(pub String);

impl InvalidInput {
    pub(crate) fn required(field: &str) -> Self {
        Self(format!("{} is required", field))
    }
}

/// Coarse classification of an [`IngestError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestErrorKind {
    InvalidInput,
    Conflict,
    Unavailable,
    Storage,
    Verification,
    Metadata,
}

/// Failure of a single ingestion
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Missing or malformed name/version
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),

    /// Another ingestion of the same name/version is in flight
    #[error("upload already in progress for {0}")]
    Conflict(ArtifactKey),

    /// The lock could not be taken because the metadata store is unreachable
    #[error("upload lock unavailable: {0}")]
    Unavailable(#[source] MetadataError),

    /// Durable write of the payload failed
    #[error("failed to store artifact: {0}")]
    Storage(#[source] BlobError),

    /// Read-back of the written payload did not match
    #[error("artifact verification failed: {0}")]
    Verification(#[source] VerificationFailure),

    /// The metadata transaction failed and the blob was rolled back
    #[error("failed to commit metadata: {0}")]
    Metadata(#[source] MetadataError),
}

impl IngestError {
    /// Classification for callers that only need to branch on the category
    pub fn kind(&self) -> IngestErrorKind {
        match self {
            IngestError::InvalidInput(_) => IngestErrorKind::InvalidInput,
            IngestError::Conflict(_) => IngestErrorKind::Conflict,
            IngestError::Unavailable(_) => IngestErrorKind::Unavailable,
            IngestError::Storage(_) => IngestErrorKind::Storage,
            IngestError::Verification(_) => IngestErrorKind::Verification,
            IngestError::Metadata(_) => IngestErrorKind::Metadata,
        }
    }

    /// HTTP-style status code for this error
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            IngestErrorKind::InvalidInput => 400,
            IngestErrorKind::Conflict => 409,
            IngestErrorKind::Unavailable => 503,
            IngestErrorKind::Storage
            | IngestErrorKind::Verification
            | IngestErrorKind::Metadata => 500,
        }
    }

    /// Whether retrying the same request later can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            IngestErrorKind::Conflict | IngestErrorKind::Unavailable
        )
    }
}

/// Why a written artifact failed read-back verification
#[derive(Debug, thiserror::Error)]
pub enum VerificationFailure {
    #[error("artifact not readable: {0}")]
    Unreadable(#[source] BlobError),

    #[error("size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
}

/// Failure of a read-side catalog query
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("metadata store error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("blob store error: {0}")]
    Storage(#[from] BlobError),
}

/// Failure delivering to a subscriber transport
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The receiving side went away
    #[error("subscriber disconnected")]
    Disconnected,

    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Abnormal end of a subscription session
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),

    /// The subscriber transport failed while delivering
    #[error("subscriber {subscriber_id} transport failed: {source}")]
    Transport {
        subscriber_id: String,
        #[source]
        source: SinkError,
    },

    /// The session task panicked or was aborted
    #[error("subscription task failed: {0}")]
    Task(String),
}

/// Failure handing an update to the broadcast hub
#[derive(Debug, thiserror::Error)]
pub enum PropagationError {
    #[error("failed to connect to hub at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("hub request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("hub I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The hub answered with an error frame
    #[error("hub rejected update: {0}")]
    Rejected(String),
}

/// Malformed or unexpected bridge frame
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown frame kind 0x{0:02x}")]
    UnknownFrameKind(u8),

    #[error("frame header too large: {size} bytes (max {max})")]
    HeaderTooLarge { size: usize, max: usize },

    #[error("frame body too large: {size} bytes (max {max})")]
    BodyTooLarge { size: usize, max: usize },

    #[error("invalid frame header: {0}")]
    InvalidHeader(#[from] serde_json::Error),

    #[error("unexpected frame: {0}")]
    UnexpectedFrame(String),

    /// A well-formed frame whose contents are inconsistent
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("connection closed mid-frame")]
    Truncated,

    #[error("connection closed before a response")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Invalid configuration value
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}
