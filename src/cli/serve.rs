//! Serve command implementation

use super::{connect_store, shutdown_signal};
use crate::api::{self, ApiState};
use crate::config::Config;
use crate::query::PriceQuery;
use clap::Args;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Listen address, overrides api.bind
    #[arg(long)]
    pub bind: Option<String>,
}

impl ServeArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = connect_store(config).await?;
        let query = PriceQuery::new(Arc::new(store)).with_max_limit(config.api.max_limit);
        let state = ApiState::new(query, config.api.default_limit);

        let bind = self.bind.as_deref().unwrap_or(config.api.bind.as_str());
        let listener = TcpListener::bind(bind).await?;

        api::serve(listener, state, shutdown_signal()).await
    }
}
