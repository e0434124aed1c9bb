use clap::Parser;
use index_price_history::cli::{Cli, Commands};
use index_price_history::config::Config;
use index_price_history::store::PgPriceStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
            eprintln!("Using default configuration");
            Config::from_toml(include_str!("../config.toml.example"))?
        }
    };

    // Initialize telemetry
    index_price_history::telemetry::init_telemetry(&config.telemetry)?;

    if let Commands::Config = cli.command {
        println!("Current configuration:");
        println!("  Database: {}", config.database.redacted_url());
        println!("  Quote source: {}", config.quote.base_url);
        println!("  Tickers: {:?}", config.ingest.tickers);
        println!("  Interval: {}s", config.ingest.interval_secs);
        println!("  API: {}", config.api.bind);
        return Ok(());
    }

    config.validate()?;

    match cli.command {
        Commands::Ingest(args) => {
            tracing::debug!("Running one ingestion cycle");
            args.execute(&config).await?;
        }
        Commands::Worker(args) => {
            tracing::info!("Starting ingestion worker");
            args.execute(&config).await?;
        }
        Commands::Serve(args) => {
            tracing::info!("Starting read API");
            args.execute(&config).await?;
        }
        Commands::Migrate => {
            PgPriceStore::connect(&config.database.store_config())
                .await?
                .migrate()
                .await?;
        }
        Commands::Latest(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {}
    }

    Ok(())
}
