//! Metadata store error types

/// Error type for metadata store operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    /// Store could not be reached
    #[error("metadata store unavailable: {0}")]
    Unavailable(String),

    /// Transaction was rejected; nothing was applied
    #[error("transaction failed: {0}")]
    Transaction(String),

    /// Stored value could not be decoded
    #[error("corrupt value at {key}: {reason}")]
    Corrupt { key: String, reason: String },
}
