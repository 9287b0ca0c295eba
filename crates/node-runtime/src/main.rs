//! # RELOAD Overlay Peer
//!
//! Runs one overlay peer on the in-process network.
//!
//! ```text
//! node-runtime [config.toml]
//! ```
//!
//! Without a config file the peer starts with a random node id in the
//! default overlay.

use anyhow::{Context, Result};
use node_runtime::{InMemoryNetwork, OverlayPeer, TomlConfigProvider};
use overlay_telemetry::{init_telemetry, TelemetryConfig};
use tracing::{info, warn};

fn load_config() -> Result<TomlConfigProvider> {
    match std::env::args().nth(1) {
        Some(path) => {
            TomlConfigProvider::load(&path).with_context(|| format!("loading {path}"))
        }
        None => TomlConfigProvider::parse("").context("building default config"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?.into_peer_config();

    init_telemetry(&TelemetryConfig::for_peer(&config.overlay))?;

    info!("===========================================");
    info!("  RELOAD Overlay Peer v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let network = InMemoryNetwork::new();
    let peer = OverlayPeer::start(config, &network)?;
    info!(node_id = %peer.node_id(), overlay = %peer.overlay(), "Peer ready");

    if let Err(err) = peer.announce().await {
        warn!(error = %err, "Gateway registration failed");
    }

    tokio::signal::ctrl_c()
        .await
        .context("waiting for ctrl-c")?;
    info!("Shutdown signal received");
    peer.shutdown();
    Ok(())
}
