//! Worker command implementation

use super::{build_coordinator, shutdown_signal};
use crate::config::Config;
use crate::ingest::IngestWorker;
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct WorkerArgs {
    /// Fire immediately instead of waiting for the next minute boundary
    #[arg(long)]
    pub no_align: bool,
}

impl WorkerArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let coordinator = build_coordinator(config).await?;

        let mut worker_config = config.ingest.worker_config();
        worker_config.align_to_minute = !self.no_align;

        IngestWorker::new(Arc::new(coordinator), worker_config)
            .run(shutdown_signal())
            .await;
        Ok(())
    }
}
