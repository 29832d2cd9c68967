use anyhow::Context;
use clap::Parser;
use raft_worker::config::NodeConfig;
use raft_worker::raft::RaftNode;
use raft_worker::{monitor, transport};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "raft-worker",
    about = "Raft worker node: replicated file storage and model registry"
)]
struct Args {
    /// Path to the node's TOML configuration
    #[arg(long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config =
        NodeConfig::load(&args.config).with_context(|| format!("loading {}", args.config))?;

    tracing::info!("Starting worker node {}", config.node_id);
    if !config.peers.is_empty() {
        tracing::info!("Configured peers: {:?}", config.peers);
    }

    let node = RaftNode::open(&config).context("opening node state")?;
    let node = Arc::new(Mutex::new(node));

    let raft_listener = TcpListener::bind(config.raft_addr())
        .await
        .with_context(|| format!("binding Raft listener on {}", config.raft_addr()))?;
    tracing::info!("Raft RPC listening on {}", config.raft_addr());

    let monitor_listener = TcpListener::bind(config.monitor_addr())
        .await
        .with_context(|| format!("binding monitor listener on {}", config.monitor_addr()))?;
    tracing::info!("Status monitor listening on {}", config.monitor_addr());

    tokio::spawn(transport::serve(raft_listener, node.clone()));

    {
        let node = node.clone();
        tokio::spawn(async move {
            if let Err(e) = monitor::serve(monitor_listener, node).await {
                tracing::error!("Monitor server exited: {}", e);
            }
        });
    }

    shutdown_signal().await;
    tracing::info!("Shutting down node");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
