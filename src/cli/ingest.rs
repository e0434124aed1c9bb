//! Ingest command implementation

use super::build_coordinator;
use crate::config::Config;
use clap::Args;

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Pretty-print the JSON outcome
    #[arg(long)]
    pub pretty: bool,
}

impl IngestArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let coordinator = build_coordinator(config).await?;
        let outcome = coordinator.run_ingestion().await?;

        let report = outcome.report();
        let json = if self.pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };
        println!("{json}");
        Ok(())
    }
}
