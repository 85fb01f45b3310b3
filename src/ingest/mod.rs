//! Artifact ingestion
//!
//! [`IngestCoordinator::ingest`] runs one upload through these steps:
//!
//! ```text
//!   validate -> upload lock -> (hash || blob save) -> read-back verify
//!            -> atomic metadata commit -> propagate -> unlock
//! ```
//!
//! A failure after the blob is written deletes it again, so readers never
//! see bytes without metadata or metadata without verified bytes.

pub mod checksum;
pub mod config;
pub mod coordinator;
pub mod lock;

pub use checksum::sha256_hex;
pub use config::IngestConfig;
pub use coordinator::IngestCoordinator;
pub use lock::UploadLock;
