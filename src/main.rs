//! EaseForm - privacy-first form builder backend

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use easeform::{config::Args, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("easeform={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  EaseForm API");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Environment: {}", args.environment);
    info!("Storage: {}", args.supabase_url);
    info!("Frontend origin: {}", args.frontend_url);
    info!("API prefix: {}", args.api_prefix);
    info!("======================================");

    // Create application state (storage channels, resolver, validator)
    let state = match server::AppState::new(args) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application state: {}", e);
            std::process::exit(1);
        }
    };

    // Run the server
    if let Err(e) = server::run(Arc::new(state)).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
