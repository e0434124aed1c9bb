//! Postgres store backed by sqlx
//!
//! The ingestion lock is a session-level advisory lock. Sessions run on a
//! connection detached from the pool, so closing the session (or losing the
//! connection) ends the Postgres backend and frees the lock with it.

use super::{IngestSession, PriceStore, StoreError};
use crate::price::{BucketRange, PriceObservation, Quote, Ticker};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use sqlx::{Connection, Executor, FromRow, Postgres};
use std::time::Duration;

const UPSERT_SQL: &str = r#"
    INSERT INTO price_observations (ticker, bucket, price)
    VALUES ($1, $2, $3)
    ON CONFLICT (ticker, bucket) DO UPDATE SET
        price = EXCLUDED.price,
        recorded_at = now()
"#;

const COUNT_SQL: &str = r#"
    SELECT COUNT(*)
    FROM price_observations
    WHERE ticker = $1
      AND ($2::BIGINT IS NULL OR bucket >= $2)
      AND ($3::BIGINT IS NULL OR bucket <= $3)
"#;

const LATEST_SQL: &str = r#"
    SELECT ticker, bucket, price, recorded_at
    FROM price_observations
    WHERE ticker = $1
    ORDER BY bucket DESC
    LIMIT 1
"#;

const RANGE_SQL: &str = r#"
    SELECT ticker, bucket, price, recorded_at
    FROM price_observations
    WHERE ticker = $1
      AND ($2::BIGINT IS NULL OR bucket >= $2)
      AND ($3::BIGINT IS NULL OR bucket <= $3)
    ORDER BY bucket ASC
    LIMIT $4 OFFSET $5
"#;

/// Connection pool settings
#[derive(Debug, Clone)]
pub struct PgStoreConfig {
    /// Postgres connection URL
    pub url: String,
    /// Pool size; each running ingestion holds one connection outside the pool
    pub max_connections: u32,
    /// How long to wait for a pooled connection
    pub acquire_timeout: Duration,
}

impl PgStoreConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Price store on Postgres
#[derive(Debug, Clone)]
pub struct PgPriceStore {
    pool: PgPool,
}

impl PgPriceStore {
    /// Connect a pool with the given settings
    pub async fn connect(config: &PgStoreConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .test_before_acquire(true)
            .connect(&config.url)
            .await?;

        tracing::info!(
            max_connections = config.max_connections,
            "Connected to postgres"
        );

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Schema migrations applied");
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct PriceRow {
    ticker: String,
    bucket: i64,
    price: Decimal,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<PriceRow> for PriceObservation {
    type Error = StoreError;

    fn try_from(row: PriceRow) -> Result<Self, Self::Error> {
        let ticker = row
            .ticker
            .parse::<Ticker>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        Ok(PriceObservation {
            ticker,
            bucket: row.bucket,
            price: row.price,
            recorded_at: row.recorded_at,
        })
    }
}

async fn upsert_with<'e, E>(
    executor: E,
    ticker: Ticker,
    bucket: i64,
    price: Decimal,
) -> Result<(), StoreError>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(UPSERT_SQL)
        .bind(ticker.as_str())
        .bind(bucket)
        .bind(price)
        .execute(executor)
        .await?;
    Ok(())
}

#[async_trait]
impl PriceStore for PgPriceStore {
    async fn open_session(&self) -> Result<Box<dyn IngestSession>, StoreError> {
        let conn = self.pool.acquire().await?.detach();
        Ok(Box::new(PgIngestSession { conn }))
    }

    async fn upsert(&self, ticker: Ticker, bucket: i64, price: Decimal) -> Result<(), StoreError> {
        upsert_with(&self.pool, ticker, bucket, price).await
    }

    async fn count(&self, ticker: Ticker, range: BucketRange) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(COUNT_SQL)
            .bind(ticker.as_str())
            .bind(range.from)
            .bind(range.to)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn latest(&self, ticker: Ticker) -> Result<Option<PriceObservation>, StoreError> {
        let row: Option<PriceRow> = sqlx::query_as(LATEST_SQL)
            .bind(ticker.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(PriceObservation::try_from).transpose()
    }

    async fn range(
        &self,
        ticker: Ticker,
        range: BucketRange,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PriceObservation>, StoreError> {
        let rows: Vec<PriceRow> = sqlx::query_as(RANGE_SQL)
            .bind(ticker.as_str())
            .bind(range.from)
            .bind(range.to)
            .bind(i64::from(limit))
            .bind(i64::try_from(offset).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(PriceObservation::try_from).collect()
    }
}

/// Ingestion session on a dedicated connection
struct PgIngestSession {
    conn: PgConnection,
}

#[async_trait]
impl IngestSession for PgIngestSession {
    async fn try_acquire(&mut self, key: i64) -> Result<bool, StoreError> {
        let locked: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
            .bind(key)
            .fetch_one(&mut self.conn)
            .await?;
        Ok(locked)
    }

    async fn release(&mut self, key: i64) -> Result<(), StoreError> {
        let released: bool = sqlx::query_scalar("SELECT pg_advisory_unlock($1)")
            .bind(key)
            .fetch_one(&mut self.conn)
            .await?;
        if !released {
            tracing::debug!(key, "Advisory lock was not held by this session");
        }
        Ok(())
    }

    async fn commit_bucket(&mut self, bucket: i64, quotes: &[Quote]) -> Result<(), StoreError> {
        // Dropping the transaction on error rolls it back
        let mut tx = self.conn.begin().await?;
        for quote in quotes {
            upsert_with(&mut *tx, quote.ticker, bucket, quote.price).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), StoreError> {
        self.conn.close().await?;
        Ok(())
    }
}
