//! Latest command implementation

use super::connect_store;
use crate::config::Config;
use crate::query::PriceQuery;
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct LatestArgs {
    /// Single ticker to show (default: every configured ticker)
    #[arg(short, long)]
    pub ticker: Option<String>,
}

impl LatestArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let query = PriceQuery::new(Arc::new(connect_store(config).await?));

        let tickers: Vec<String> = match &self.ticker {
            Some(ticker) => vec![ticker.clone()],
            None => config
                .ingest
                .tickers
                .iter()
                .map(|t| t.to_string())
                .collect(),
        };

        for ticker in tickers {
            match query.latest(&ticker).await? {
                Some(observation) => println!(
                    "{:<8} {:>12} {}  (recorded {})",
                    observation.ticker,
                    observation.bucket,
                    observation.price,
                    observation.recorded_at.to_rfc3339()
                ),
                None => println!("{:<8} no observations", ticker),
            }
        }
        Ok(())
    }
}
