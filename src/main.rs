//! Multi-room Chat Server - Entry Point
//!
//! Parses the command line, binds the TCP listener and hands it to the
//! accept loop.

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use room_chat::{serve, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=room_chat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("room_chat=info")),
        )
        .init();

    let config = ServerConfig::parse();

    let listener = TcpListener::bind(&config.addr).await?;
    info!(
        "Starting chat server on {} (outbound buffer {}, overflow policy {:?})",
        config.addr, config.outbound_buffer, config.overflow_policy
    );

    serve(listener, config).await?;
    Ok(())
}
