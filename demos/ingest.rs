//! Ingest a file and propagate it to a remote hub
//!
//! Run with: cargo run --example ingest <NAME> <VERSION> <FILE>
//!
//! Stores the file under `STORAGE_PATH` and announces it to the hub at
//! `HUB_ADDR`. Metadata is kept in memory, so this demo only shows the
//! ingestion path; run `hub_server` and `subscriber` alongside it to watch
//! the update arrive.

use std::sync::Arc;

use bytes::Bytes;
use worker_control_plane::{
    BridgeClient, ControlPlaneConfig, FsBlobStore, IngestCoordinator, MemoryMetadataStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("worker_control_plane=debug".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        eprintln!("Usage: {} <NAME> <VERSION> <FILE>", args[0]);
        std::process::exit(2);
    }

    let config = ControlPlaneConfig::from_env()?;
    let payload = Bytes::from(tokio::fs::read(&args[3]).await?);

    let coordinator = IngestCoordinator::with_config(
        Arc::new(FsBlobStore::open(config.storage_path.clone()).await?),
        Arc::new(MemoryMetadataStore::new()),
        Arc::new(BridgeClient::new(config.client.clone())),
        config.ingest.clone(),
    );

    match coordinator.ingest(&args[1], &args[2], payload).await {
        Ok(metadata) => {
            println!(
                "Stored {}@{} ({} bytes) sha256={} at {}",
                metadata.name, metadata.version, metadata.size, metadata.checksum, metadata.path
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("Ingestion failed ({}): {}", e.status_code(), e);
            std::process::exit(1);
        }
    }
}
