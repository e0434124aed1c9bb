//! Configuration types for index-price-history

use crate::ingest::WorkerConfig;
use crate::price::Ticker;
use crate::quote::{DeribitConfig, DERIBIT_TESTNET_URL};
use crate::store::PgStoreConfig;
use crate::telemetry::LogFormat;
use serde::Deserialize;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub quote: QuoteConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Postgres configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL; `DATABASE_URL` overrides it
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    /// Apply migrations when a command connects
    #[serde(default)]
    pub run_migrations: bool,
}

/// Quote source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteConfig {
    /// Deribit API base URL; `DERIBIT_BASE_URL` overrides it
    #[serde(default = "default_quote_base_url")]
    pub base_url: String,
    #[serde(default = "default_quote_timeout_secs")]
    pub timeout_secs: u64,
}

/// Ingestion scheduling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Tickers fetched each run, in order
    #[serde(default = "default_tickers")]
    pub tickers: Vec<Ticker>,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_rate_limit_retries")]
    pub rate_limit_retries: u32,
    #[serde(default = "default_rate_limit_backoff_secs")]
    pub rate_limit_backoff_secs: u64,
}

/// HTTP read API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Log level; `LOG_LEVEL` overrides it and `RUST_LOG` overrides both
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Prometheus exporter port, disabled when absent
    pub metrics_port: Option<u16>,
}

fn default_max_connections() -> u32 {
    5
}
fn default_acquire_timeout_secs() -> u64 {
    5
}
fn default_quote_base_url() -> String {
    DERIBIT_TESTNET_URL.to_string()
}
fn default_quote_timeout_secs() -> u64 {
    10
}
fn default_tickers() -> Vec<Ticker> {
    Ticker::ALL.to_vec()
}
fn default_interval_secs() -> u64 {
    60
}
fn default_rate_limit_retries() -> u32 {
    1
}
fn default_rate_limit_backoff_secs() -> u64 {
    5
}
fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}
fn default_limit() -> u32 {
    100
}
fn default_max_limit() -> u32 {
    1000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_quote_base_url(),
            timeout_secs: default_quote_timeout_secs(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            tickers: default_tickers(),
            interval_secs: default_interval_secs(),
            rate_limit_retries: default_rate_limit_retries(),
            rate_limit_backoff_secs: default_rate_limit_backoff_secs(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_port: None,
        }
    }
}

impl DatabaseConfig {
    pub fn store_config(&self) -> PgStoreConfig {
        PgStoreConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            acquire_timeout: Duration::from_secs(self.acquire_timeout_secs),
        }
    }

    /// URL with the password masked
    pub fn redacted_url(&self) -> String {
        match (self.url.find("://"), self.url.rfind('@')) {
            (Some(scheme_end), Some(at)) if at > scheme_end => {
                let credentials = &self.url[scheme_end + 3..at];
                match credentials.split_once(':') {
                    Some((user, _)) => format!(
                        "{}{}:***{}",
                        &self.url[..scheme_end + 3],
                        user,
                        &self.url[at..]
                    ),
                    None => self.url.clone(),
                }
            }
            _ => self.url.clone(),
        }
    }
}

impl QuoteConfig {
    pub fn deribit_config(&self) -> DeribitConfig {
        DeribitConfig::new(&self.base_url).timeout(Duration::from_secs(self.timeout_secs))
    }
}

impl IngestConfig {
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            interval: Duration::from_secs(self.interval_secs),
            rate_limit_retries: self.rate_limit_retries,
            rate_limit_backoff: Duration::from_secs(self.rate_limit_backoff_secs),
            align_to_minute: true,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then apply environment overrides
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration text, then apply environment overrides
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override fields from `DATABASE_URL`, `DERIBIT_BASE_URL` and `LOG_LEVEL`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(url) = lookup("DERIBIT_BASE_URL") {
            self.quote.base_url = url;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.telemetry.log_level = level.to_lowercase();
        }
    }

    /// Reject settings no command can run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.url.is_empty() {
            anyhow::bail!("database.url must be set (or DATABASE_URL)");
        }
        if self.ingest.tickers.is_empty() {
            anyhow::bail!("ingest.tickers must list at least one ticker");
        }
        if self.ingest.interval_secs == 0 {
            anyhow::bail!("ingest.interval_secs must be positive");
        }
        if self.api.default_limit == 0 || self.api.default_limit > self.api.max_limit {
            anyhow::bail!("api.default_limit must be within 1..=api.max_limit");
        }
        Ok(())
    }
}
