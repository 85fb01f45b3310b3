//! # worker-control-plane
//!
//! Ingestion and real-time fan-out of versioned worker artifacts.
//!
//! An upload goes through the [`IngestCoordinator`]: it is locked per
//! name/version, hashed while it is written, read back and verified, then
//! committed to metadata in one transaction. The committed
//! [`UpdateEvent`] is handed to an [`UpdatePropagator`], which reaches a
//! [`BroadcastHub`] either in process or over the bridge protocol. The hub
//! fans events out to bounded per-subscriber queues and drops events for
//! subscribers that fall behind, so a slow consumer never stalls ingestion
//! or other consumers.
//!
//! ```text
//!  upload ──► IngestCoordinator ──► UpdatePropagator ──► BroadcastHub
//!               │        │          (local | bridge)       │  │  │
//!           BlobStore  MetadataStore                    sessions ──► subscribers
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use worker_control_plane::{ControlPlane, SubscribeRequest};
//!
//! # async fn example() -> worker_control_plane::Result<()> {
//! let plane = ControlPlane::in_memory();
//!
//! let mut updates = plane
//!     .subscribe(SubscribeRequest::new("edge-1").with_artifacts(["router"]))
//!     .await?;
//!
//! plane.ingest("router", "1.4.0", Bytes::from_static(b"...")).await?;
//!
//! if let Some(event) = updates.next().await {
//!     println!("{} {} {}", event.name, event.version, event.checksum);
//! }
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod blob;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod hub;
pub mod ingest;
pub mod metadata;
pub mod plane;
pub mod propagation;
pub mod protocol;
pub mod server;
pub mod session;
pub mod stats;

pub use artifact::{ArtifactKey, ArtifactMetadata, UpdateEvent};
pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use catalog::Catalog;
pub use client::{BridgeClient, ClientConfig, RemoteSubscription};
pub use config::ControlPlaneConfig;
pub use error::{Error, IngestError, Result};
pub use hub::{BroadcastHub, BroadcastReport, HubConfig, SubscriberFilter};
pub use ingest::{IngestConfig, IngestCoordinator};
pub use metadata::{MemoryMetadataStore, MetadataStore};
pub use plane::ControlPlane;
pub use propagation::{LocalPropagator, UpdatePropagator};
pub use server::{BridgeServer, ServerConfig};
pub use session::{SubscribeRequest, Subscription, SubscriptionService};
pub use stats::{HubStats, SessionStats};
