mod routes;
mod state;
mod worker;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use lo_catalog::{load_content, load_inventory};
use tracing_subscriber::EnvFilter;

use crate::routes::make_router_with_cors;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "lo_daemon", about = "Loadout optimizer HTTP daemon")]
struct Cli {
    #[arg(long, default_value = "./content")]
    content_dir: String,
    #[arg(long, default_value_t = 3002)]
    port: u16,
    #[arg(long, default_value = "http://localhost:5173")]
    cors_origin: String,
    /// Delay before a submitted search starts; newer submissions replace it.
    #[arg(long, default_value_t = 150)]
    debounce_ms: u64,
    /// Inventory export to load at startup.
    #[arg(long)]
    inventory: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let catalog = load_content(&cli.content_dir)?;
    let inventory = match &cli.inventory {
        Some(path) => load_inventory(path)?,
        None => Vec::new(),
    };
    tracing::info!(
        content_version = %catalog.content_version,
        items = inventory.len(),
        "content loaded"
    );

    let has_inventory = !inventory.is_empty();
    let state = AppState::new(
        Arc::new(catalog),
        inventory,
        Duration::from_millis(cli.debounce_ms),
    );
    if has_inventory {
        state.resubmit()?;
    }

    let app = make_router_with_cors(state, &cli.cors_origin)?;
    let addr = SocketAddr::from(([127, 0, 0, 1], cli.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "lo_daemon listening");
    axum::serve(listener, app).await.context("serving")?;
    Ok(())
}
