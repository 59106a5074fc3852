//! atomgate - REST record store for Intuition protocol activity

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use atomgate::{config::Args, server, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("atomgate={},info", args.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if args.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  atomgate {}", env!("CARGO_PKG_VERSION"));
    info!("  Intuition record store");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Max body: {} bytes", args.max_body_bytes);
    info!("======================================");

    let state = Arc::new(AppState::new(args));
    server::run(state).await?;

    Ok(())
}
