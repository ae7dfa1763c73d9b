//! Standalone entry point: serve a content root (or the embedded mock
//! frontend) the way the plugin host would, and stop on Ctrl-C/SIGTERM.

use anyhow::Context;
use clap::Parser;
use flight::{ServerConfig, ServerHandle, StandaloneHost, config, run_plugin};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "flight", version, about = "Loopback UI server for the Flight plugin")]
struct Args {
    /// Content root to serve. Defaults to the configured root, then to
    /// `dist/` next to the executable.
    #[arg(long, env = "FLIGHT_ROOT")]
    root: Option<PathBuf>,

    /// First port tried by the probe scan.
    #[arg(long)]
    port: Option<u16>,

    /// Total ports probed before giving up.
    #[arg(long)]
    max_port_attempts: Option<u32>,

    /// Serve the embedded mock frontend instead of a content root.
    #[arg(long)]
    mock: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flight=info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if let Err(err) = config::ensure_app_config_exists() {
        tracing::warn!(%err, "could not write default config");
    }
    let app_config = config::load_app_config();

    // --mock wins, then the flag/env, then the persisted root, then dist/
    // next to the executable. The temp dir must outlive the server.
    let (_mock_dir, root_dir) = if args.mock {
        let dir = tempfile::tempdir().context("create temp dir for mock frontend")?;
        let root = flight_mock_ui::materialize(dir.path())
            .context("materialize mock frontend")?;
        tracing::info!(root = %root.display(), "serving embedded mock frontend");
        (Some(dir), root)
    } else {
        let root = args
            .root
            .or(app_config.root_dir)
            .unwrap_or_else(ServerConfig::default_root);
        (None, root)
    };

    let handle = ServerHandle::new(ServerConfig {
        root_dir,
        preferred_port: args.port.unwrap_or(app_config.preferred_port),
        max_port_attempts: args.max_port_attempts.unwrap_or(app_config.max_port_attempts),
        port_file: Some(config::default_port_file()),
    });

    let url = handle.start().await.context("failed to start ui server")?;
    tracing::info!(%url, "flight ui available");

    let mut host = StandaloneHost::new();
    run_plugin(&mut host, &handle).await;

    Ok(())
}
