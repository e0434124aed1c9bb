//! Time-series store
//!
//! Keyed storage of price observations plus the session-scoped advisory lock
//! that serializes ingestion runs across processes. A session owns one storage
//! connection; the lock and the bucket write both go through it, so the lock
//! can never outlive or undershoot the transaction it protects.

mod memory;
mod postgres;

pub use memory::MemoryPriceStore;
pub use postgres::{PgPriceStore, PgStoreConfig};

use crate::price::{BucketRange, PriceObservation, Quote, Ticker};
use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database driver or connection failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// Schema migration failure
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    /// Row that does not map back to a domain value
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Stable tag for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Database(_) => "database",
            StoreError::Migrate(_) => "migrate",
            StoreError::Corrupt(_) => "corrupt",
        }
    }
}

/// Read and write access to stored observations
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Open a session bound to a single storage connection
    async fn open_session(&self) -> Result<Box<dyn IngestSession>, StoreError>;

    /// Insert or overwrite the observation for (ticker, bucket)
    async fn upsert(&self, ticker: Ticker, bucket: i64, price: Decimal) -> Result<(), StoreError>;

    /// Number of observations for a ticker within inclusive bounds
    async fn count(&self, ticker: Ticker, range: BucketRange) -> Result<u64, StoreError>;

    /// Observation with the highest bucket, if any
    async fn latest(&self, ticker: Ticker) -> Result<Option<PriceObservation>, StoreError>;

    /// Observations ordered by ascending bucket, windowed by limit/offset
    async fn range(
        &self,
        ticker: Ticker,
        range: BucketRange,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PriceObservation>, StoreError>;
}

/// One storage connection holding the ingestion lock and its writes
#[async_trait]
pub trait IngestSession: Send {
    /// Take the lock without waiting; `false` when held by another session
    async fn try_acquire(&mut self, key: i64) -> Result<bool, StoreError>;

    /// Release a lock taken by this session; unheld keys are ignored
    async fn release(&mut self, key: i64) -> Result<(), StoreError>;

    /// Upsert every quote for the bucket in one transaction
    async fn commit_bucket(&mut self, bucket: i64, quotes: &[Quote]) -> Result<(), StoreError>;

    /// Close the connection, dropping any lock still held
    async fn close(self: Box<Self>) -> Result<(), StoreError>;
}
