//! md5-relay
//!
//! Listens for plain TCP connections and relays each one to a fixed BGP peer
//! over a TCP-MD5 signed connection.

use clap::Parser;

use md5_relay::config::cli::Cli;
use md5_relay::lifecycle::{signals, startup};
use md5_relay::observability::{logging, metrics};
use md5_relay::{RelayServer, Shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init_logging(&config.observability);

    tracing::info!("md5-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::debug!(?config, "Configuration loaded");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let started = startup::start(&config).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown);

    RelayServer::new(&config, started.dialer)
        .run(started.listener, server_shutdown)
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
