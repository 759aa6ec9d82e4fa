//! chord-stats - answer statistics for the chord quiz
//!
//! Stores one record per answered question and serves:
//! - the raw record history
//! - a gap-filled count of answers per day over the last 32 days

mod config;
mod db;
mod stats;
mod web;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before any other initialization)
    let _ = dotenvy::dotenv();

    let cli = config::Cli::parse();
    let config = config::Config::load(&cli).context("Error parsing configuration")?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.to_lowercase()));

    // Use LOG_FORMAT=gcp for structured GCP Cloud Logging
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "gcp" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting chord-stats...");
    info!("Configuration loaded");

    let db = db::Database::new(&config.database)
        .await
        .context("Failed to connect to the statistics database")?;
    db.ping()
        .await
        .context("Failed to ping the statistics database")?;
    db.run_migrations().await?;
    info!("Database initialized");

    let served = web::start_server(&config, db.clone()).await;
    db.close().await;
    served
}
