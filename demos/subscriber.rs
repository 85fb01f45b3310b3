//! Remote subscriber
//!
//! Run with: cargo run --example subscriber [SUBSCRIBER_ID] [ARTIFACT...]
//!
//! Examples:
//!   cargo run --example subscriber                 # id "demo", all artifacts
//!   cargo run --example subscriber edge-1 router   # only "router" updates
//!
//! Connects to `HUB_ADDR` (default 127.0.0.1:8082).

use worker_control_plane::{ClientConfig, ControlPlaneConfig, RemoteSubscription, SubscribeRequest};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("worker_control_plane=info".parse()?),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let subscriber_id = args.next().unwrap_or_else(|| "demo".to_string());
    let artifacts: Vec<String> = args.collect();

    let config: ClientConfig = ControlPlaneConfig::from_env()?.client;
    let request = SubscribeRequest::new(subscriber_id).with_artifacts(artifacts);

    let mut subscription = RemoteSubscription::connect(&config, request).await?;
    println!(
        "Subscribed as {} to {}",
        subscription.subscriber_id(),
        config.hub_addr
    );

    loop {
        tokio::select! {
            event = subscription.next_event() => match event? {
                Some(event) => println!(
                    "{}@{} size={} checksum={} at {}",
                    event.name, event.version, event.size, event.checksum, event.timestamp
                ),
                None => {
                    println!("Hub closed the stream");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}
