//! Blob store error types

use std::io;

use super::BlobPath;

/// Error type for blob store operations
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// Nothing stored at the path
    #[error("blob not found: {0}")]
    NotFound(BlobPath),

    /// Name or version cannot be mapped to a storage location
    #[error("invalid blob key: {0}")]
    InvalidKey(String),

    /// Path was not produced by this store
    #[error("path outside blob store: {0}")]
    InvalidPath(BlobPath),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: BlobPath,
        #[source]
        source: io::Error,
    },
}
