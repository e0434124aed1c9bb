//! Read-side queries over stored prices
//!
//! Inputs are validated before the store is touched; validation failures are
//! client errors and carry a stable kind tag alongside the message.

mod pagination;

pub use pagination::{build_links, Page, PageLinks};

use crate::price::{BucketRange, PriceObservation, Ticker};
use crate::store::{PriceStore, StoreError};
use std::sync::Arc;
use thiserror::Error;

/// Largest page size accepted by default
pub const DEFAULT_MAX_LIMIT: u32 = 1000;

/// Read query failures
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("ticker must be one of {supported}")]
    InvalidTicker { ticker: String, supported: String },
    #[error("from_ts must be <= to_ts")]
    InvalidRange { from: Option<i64>, to: Option<i64> },
    #[error("bucket bounds must not be negative")]
    NegativeBound,
    #[error("limit must be between 1 and {max}")]
    InvalidLimit { limit: u32, max: u32 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QueryError {
    /// Stable tag for programmatic handling
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::InvalidTicker { .. } => "invalid_ticker",
            QueryError::InvalidRange { .. } | QueryError::NegativeBound => "invalid_range",
            QueryError::InvalidLimit { .. } => "invalid_limit",
            QueryError::Store(_) => "storage",
        }
    }

    /// Caused by the request rather than the service
    pub fn is_client_error(&self) -> bool {
        !matches!(self, QueryError::Store(_))
    }
}

/// Read operations over a price store
pub struct PriceQuery<S> {
    store: Arc<S>,
    max_limit: u32,
}

impl<S> Clone for PriceQuery<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            max_limit: self.max_limit,
        }
    }
}

impl<S: PriceStore> PriceQuery<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }

    /// Set the largest accepted page size
    pub fn with_max_limit(mut self, max_limit: u32) -> Self {
        self.max_limit = max_limit;
        self
    }

    /// Parse a ticker name against the supported set
    pub fn parse_ticker(ticker: &str) -> Result<Ticker, QueryError> {
        ticker.parse().map_err(|_| QueryError::InvalidTicker {
            ticker: ticker.to_string(),
            supported: Ticker::supported(),
        })
    }

    fn check_limit(&self, limit: u32) -> Result<(), QueryError> {
        if limit == 0 || limit > self.max_limit {
            return Err(QueryError::InvalidLimit {
                limit,
                max: self.max_limit,
            });
        }
        Ok(())
    }

    fn check_range(from: Option<i64>, to: Option<i64>) -> Result<BucketRange, QueryError> {
        if from.is_some_and(|f| f < 0) || to.is_some_and(|t| t < 0) {
            return Err(QueryError::NegativeBound);
        }
        let range = BucketRange::new(from, to);
        if range.is_inverted() {
            return Err(QueryError::InvalidRange { from, to });
        }
        Ok(range)
    }

    /// Number of observations for a ticker within optional bounds
    pub async fn count(
        &self,
        ticker: &str,
        from: Option<i64>,
        to: Option<i64>,
    ) -> Result<u64, QueryError> {
        let ticker = Self::parse_ticker(ticker)?;
        let range = Self::check_range(from, to)?;
        Ok(self.store.count(ticker, range).await?)
    }

    /// Oldest-first page of every observation for a ticker
    pub async fn list(
        &self,
        ticker: &str,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PriceObservation>, QueryError> {
        self.list_range(ticker, None, None, limit, offset).await
    }

    /// Oldest-first page of observations within inclusive bounds
    pub async fn list_range(
        &self,
        ticker: &str,
        from: Option<i64>,
        to: Option<i64>,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PriceObservation>, QueryError> {
        let ticker = Self::parse_ticker(ticker)?;
        let range = Self::check_range(from, to)?;
        self.check_limit(limit)?;
        Ok(self.store.range(ticker, range, limit, offset).await?)
    }

    /// Most recent observation; `None` when the ticker has no rows yet
    pub async fn latest(&self, ticker: &str) -> Result<Option<PriceObservation>, QueryError> {
        let ticker = Self::parse_ticker(ticker)?;
        Ok(self.store.latest(ticker).await?)
    }

    /// Page envelope over every observation for a ticker
    pub async fn list_prices(
        &self,
        url: &str,
        ticker: &str,
        limit: u32,
        offset: u64,
    ) -> Result<Page<PriceObservation>, QueryError> {
        self.list_prices_range(url, ticker, None, None, limit, offset)
            .await
    }

    /// Page envelope over observations within inclusive bounds
    pub async fn list_prices_range(
        &self,
        url: &str,
        ticker: &str,
        from: Option<i64>,
        to: Option<i64>,
        limit: u32,
        offset: u64,
    ) -> Result<Page<PriceObservation>, QueryError> {
        let parsed = Self::parse_ticker(ticker)?;
        let range = Self::check_range(from, to)?;
        self.check_limit(limit)?;

        let count = self.store.count(parsed, range).await?;
        let results = self.store.range(parsed, range, limit, offset).await?;

        Ok(build_links(url, count, limit, offset).with_results(results))
    }

    /// Alias of [`PriceQuery::latest`] matching the read API naming
    pub async fn latest_price(&self, ticker: &str) -> Result<Option<PriceObservation>, QueryError> {
        self.latest(ticker).await
    }
}
