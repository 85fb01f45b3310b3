//! Hub with a bridge server
//!
//! Run with: cargo run --example hub_server
//!
//! Reads the usual environment variables (`BRIDGE_ADDR`, `STORAGE_PATH`,
//! `HUB_QUEUE_CAPACITY`, ...). Remote coordinators propagate to it with
//! `BridgeClient` and remote subscribers attach with `RemoteSubscription`.
//! Prints hub statistics every ten seconds until Ctrl-C.

use std::time::Duration;

use worker_control_plane::{ControlPlane, ControlPlaneConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("worker_control_plane=debug".parse()?)
                .add_directive("hub_server=debug".parse()?),
        )
        .init();

    let config = ControlPlaneConfig::from_env()?;
    let plane = ControlPlane::open(&config).await?;
    let server = plane.bridge_server(config.server.clone());

    println!("Hub listening on {}", server.bind_addr());

    let hub = plane.hub().clone();
    let reporter = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(10));
        loop {
            ticker.tick().await;
            let stats = hub.stats().await;
            println!(
                "Stats: subscribers={} broadcasts={} enqueued={} dropped={}",
                stats.active_subscribers,
                stats.broadcasts,
                stats.events_enqueued,
                stats.events_dropped,
            );
        }
    });

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("\nShutting down...");
        })
        .await?;

    reporter.abort();
    Ok(())
}
