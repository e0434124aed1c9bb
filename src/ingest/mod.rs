//! Ingestion coordinator
//!
//! One run fetches every tracked ticker and writes them under the current
//! minute bucket. Runs are serialized across processes by a non-blocking
//! advisory lock: a run that loses the race returns `Skipped` straight away
//! instead of waiting, since the next scheduled tick will try again anyway.

mod worker;

pub use worker::{IngestWorker, WorkerConfig};

use crate::price::{current_bucket, minute_bucket, Quote, Ticker};
use crate::quote::{QuoteError, QuoteSource};
use crate::store::{IngestSession, PriceStore, StoreError};
use crate::telemetry::{record_ingest_duration, record_quote_error, record_run, RunOutcome};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Advisory lock key shared by every ingestion process
pub const INGEST_LOCK_KEY: i64 = 640_001;

/// Result of one ingestion attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Another session holds the lock
    Skipped,
    /// Every ticker was written for the bucket
    Completed { bucket: i64, tickers: Vec<Ticker> },
}

impl IngestOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, IngestOutcome::Skipped)
    }

    /// Machine-readable summary for schedulers and logs
    pub fn report(&self) -> IngestReport {
        match self {
            IngestOutcome::Skipped => IngestReport {
                skipped: true,
                ts_unix: None,
                tickers: None,
            },
            IngestOutcome::Completed { bucket, tickers } => IngestReport {
                skipped: false,
                ts_unix: Some(*bucket),
                tickers: Some(tickers.clone()),
            },
        }
    }
}

/// Serialized form of an outcome
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts_unix: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tickers: Option<Vec<Ticker>>,
}

/// Failure of a whole run; nothing was committed for the bucket
#[derive(Debug, Error)]
pub enum IngestError {
    /// Fetching one ticker failed
    #[error("fetching {ticker} failed: {source}")]
    Quote {
        ticker: Ticker,
        #[source]
        source: QuoteError,
    },
    /// Opening the session, locking or writing failed
    #[error("storage failed: {0}")]
    Store(#[from] StoreError),
}

impl IngestError {
    /// Stable tag for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Quote { source, .. } => source.kind(),
            IngestError::Store(_) => "storage",
        }
    }

    /// Throttling by the quote source, worth a retry after backoff
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, IngestError::Quote { source, .. } if source.is_rate_limited())
    }
}

/// Runs ingestion cycles against a store and a quote source
pub struct IngestCoordinator<S, Q> {
    store: Arc<S>,
    quotes: Arc<Q>,
    tickers: Vec<Ticker>,
    lock_key: i64,
}

impl<S, Q> IngestCoordinator<S, Q>
where
    S: PriceStore,
    Q: QuoteSource,
{
    /// Coordinator for every supported ticker
    pub fn new(store: Arc<S>, quotes: Arc<Q>) -> Self {
        Self {
            store,
            quotes,
            tickers: Ticker::ALL.to_vec(),
            lock_key: INGEST_LOCK_KEY,
        }
    }

    /// Restrict ingestion to the given tickers, in the given order
    pub fn with_tickers(mut self, tickers: Vec<Ticker>) -> Self {
        self.tickers = tickers;
        self
    }

    /// Use a different lock key
    pub fn with_lock_key(mut self, key: i64) -> Self {
        self.lock_key = key;
        self
    }

    pub fn tickers(&self) -> &[Ticker] {
        &self.tickers
    }

    /// Run one cycle for the current minute
    pub async fn run_ingestion(&self) -> Result<IngestOutcome, IngestError> {
        self.run_for_bucket(current_bucket()).await
    }

    /// Run one cycle for the bucket containing `now`
    pub async fn run_ingestion_at(&self, now: DateTime<Utc>) -> Result<IngestOutcome, IngestError> {
        self.run_for_bucket(minute_bucket(now)).await
    }

    async fn run_for_bucket(&self, bucket: i64) -> Result<IngestOutcome, IngestError> {
        let started = Instant::now();

        let result = self.run_bucket(bucket).await;

        match &result {
            Ok(IngestOutcome::Skipped) => {
                tracing::debug!(bucket, "Ingestion lock held elsewhere, skipping");
                record_run(RunOutcome::Skipped);
            }
            Ok(IngestOutcome::Completed { tickers, .. }) => {
                tracing::info!(bucket, tickers = tickers.len(), "Ingestion completed");
                record_run(RunOutcome::Completed);
                record_ingest_duration(started.elapsed());
            }
            Err(e) => {
                if let IngestError::Quote { source, .. } = e {
                    record_quote_error(source.kind());
                }
                tracing::warn!(bucket, kind = e.kind(), error = %e, "Ingestion failed");
                record_run(RunOutcome::Failed);
            }
        }

        result
    }

    async fn run_bucket(&self, bucket: i64) -> Result<IngestOutcome, IngestError> {
        let mut session = self.store.open_session().await?;

        let locked = match session.try_acquire(self.lock_key).await {
            Ok(locked) => locked,
            Err(e) => {
                close_session(session).await;
                return Err(e.into());
            }
        };

        if !locked {
            close_session(session).await;
            return Ok(IngestOutcome::Skipped);
        }

        let result = self.ingest_locked(session.as_mut(), bucket).await;

        // Closing the connection frees the lock even if the explicit release fails
        if let Err(e) = session.release(self.lock_key).await {
            tracing::warn!(error = %e, key = self.lock_key, "Failed to release ingestion lock");
        }
        close_session(session).await;

        result.map(|tickers| IngestOutcome::Completed { bucket, tickers })
    }

    async fn ingest_locked(
        &self,
        session: &mut dyn IngestSession,
        bucket: i64,
    ) -> Result<Vec<Ticker>, IngestError> {
        let mut quotes = Vec::with_capacity(self.tickers.len());
        for &ticker in &self.tickers {
            let price = self
                .quotes
                .index_price(ticker)
                .await
                .map_err(|source| IngestError::Quote { ticker, source })?;
            tracing::debug!(%ticker, %price, bucket, "Fetched index price");
            quotes.push(Quote::new(ticker, price));
        }

        session.commit_bucket(bucket, &quotes).await?;

        Ok(quotes.into_iter().map(|q| q.ticker).collect())
    }
}

async fn close_session(session: Box<dyn IngestSession>) {
    if let Err(e) = session.close().await {
        tracing::warn!(error = %e, "Failed to close storage session");
    }
}
