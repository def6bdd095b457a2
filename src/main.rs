//! Line-Oriented Channel Chat Server - Entry Point
//!
//! Loads configuration, starts the registry actor and chat log, and runs
//! the accept loop until Ctrl-C or `q` on stdin.

use std::env;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use line_chat_server::{serve, Config, ServerContext};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=line_chat_server=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("line_chat_server=info")),
        )
        .init();

    let mut config = Config::load()?;

    // Bind address from command line overrides everything else
    if let Some(addr) = env::args().nth(1) {
        config.bind_addr = addr;
    }

    // Start TCP listener
    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(
        "Chat server listening on {} (max {} clients)",
        config.bind_addr, config.max_clients
    );

    let ctx = ServerContext::start(&config);
    info!("Type 'q' and Enter to stop accepting connections");

    serve(listener, ctx, shutdown_requested()).await;

    info!("Server shutting down");
    Ok(())
}

/// Resolves on Ctrl-C or a line starting with `q`/`Q` on stdin
async fn shutdown_requested() {
    let console = async {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if matches!(line.chars().next(), Some('q' | 'Q')) {
                return;
            }
        }
        // stdin closed: only Ctrl-C can stop the server now
        std::future::pending::<()>().await
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Ctrl-C received"),
        _ = console => info!("Shutdown command received"),
    }
}
