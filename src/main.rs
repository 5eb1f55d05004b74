//! Mini Cache - A lightweight in-memory key-value cache server

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mini_cache::{server, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mini_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Mini Cache Server");

    let config = Config::parse();
    info!(
        "Configuration loaded: host={}, port={}, capacity={}MB, read_buffer_size={}",
        config.host, config.port, config.capacity_mb, config.read_buffer_size
    );

    server::run(config).await
}
