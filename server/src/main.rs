//! Relay server entry point.
//!
//! One `axum` listener serves both the asset-store REST surface and the
//! WebSocket relay endpoint.

use clap::Parser;
use log::info;
use server::assets::AssetStore;
use server::transport::{self, AppState};
use std::sync::Arc;

/// Command-line arguments for server configuration.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind the HTTP/WebSocket listener to.
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Root directory for the asset store (maps/heroes/menus/weapon-models/sounds).
    #[arg(short = 'a', long, default_value = "./assets")]
    asset_root: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let assets = Arc::new(AssetStore::new(args.asset_root.clone()));
    assets.seed_builtin_heroes();
    info!("Asset store rooted at {}", args.asset_root);

    let state = AppState::new(assets);
    let app = transport::router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Relay server listening on {}", addr);
    info!("WebSocket relay endpoint: ws://{}/ws", addr);
    info!("Asset store REST surface: http://{}/api/<kind>[/<name>]", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
