//! CLI interface for index-price-history
//!
//! Provides subcommands for:
//! - `ingest`: Run one ingestion cycle and print its outcome
//! - `worker`: Run ingestion every minute until interrupted
//! - `serve`: Serve the HTTP read API
//! - `migrate`: Apply database migrations
//! - `latest`: Show the latest stored price per ticker
//! - `config`: Show the effective configuration

mod ingest;
mod latest;
mod serve;
mod worker;

pub use ingest::IngestArgs;
pub use latest::LatestArgs;
pub use serve::ServeArgs;
pub use worker::WorkerArgs;

use crate::config::Config;
use crate::ingest::IngestCoordinator;
use crate::quote::DeribitClient;
use crate::store::PgPriceStore;
use clap::{Parser, Subcommand};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "index-price-history")]
#[command(about = "Per-minute index price ingestion and price history API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one ingestion cycle
    Ingest(IngestArgs),
    /// Run ingestion on a schedule
    Worker(WorkerArgs),
    /// Serve the read API
    Serve(ServeArgs),
    /// Apply database migrations
    Migrate,
    /// Show the latest price per ticker
    Latest(LatestArgs),
    /// Show configuration
    Config,
}

/// Connect the store, applying migrations when configured to
pub async fn connect_store(config: &Config) -> anyhow::Result<PgPriceStore> {
    let store = PgPriceStore::connect(&config.database.store_config()).await?;
    if config.database.run_migrations {
        store.migrate().await?;
    }
    Ok(store)
}

/// Coordinator over Postgres and Deribit for the configured tickers
pub async fn build_coordinator(
    config: &Config,
) -> anyhow::Result<IngestCoordinator<PgPriceStore, DeribitClient>> {
    let store = connect_store(config).await?;
    let quotes = DeribitClient::new(config.quote.deribit_config())?;

    Ok(
        IngestCoordinator::new(Arc::new(store), Arc::new(quotes))
            .with_tickers(config.ingest.tickers.clone()),
    )
}

/// Resolves on Ctrl-C
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
