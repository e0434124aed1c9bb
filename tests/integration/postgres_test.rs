//! Postgres store tests
//!
//! Run against a disposable database:
//! `TEST_DATABASE_URL=postgres://... cargo test --test integration postgres`.
//! Without the variable every test returns early.

use crate::support::FixedQuotes;
use chrono::DateTime;
use index_price_history::ingest::{IngestCoordinator, IngestOutcome};
use index_price_history::price::{BucketRange, Quote, Ticker};
use index_price_history::store::{PgPriceStore, PgStoreConfig, PriceStore};
use rust_decimal_macros::dec;
use std::sync::Arc;

/// Buckets far outside real ingestion so tests never collide with live rows
const BASE_BUCKET: i64 = 60 * 100_000_000;

async fn store() -> Option<PgPriceStore> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let store = PgPriceStore::connect(&PgStoreConfig::new(url)).await.unwrap();
    store.migrate().await.unwrap();
    Some(store)
}

async fn clear(store: &PgPriceStore, from: i64, to: i64) {
    sqlx::query("DELETE FROM price_observations WHERE bucket BETWEEN $1 AND $2")
        .bind(from)
        .bind(to)
        .execute(store.pool())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_upsert_overwrites_same_bucket() {
    let Some(store) = store().await else { return };
    let bucket = BASE_BUCKET + 60;
    clear(&store, bucket, bucket).await;

    store.upsert(Ticker::BtcUsd, bucket, dec!(100.5)).await.unwrap();
    store.upsert(Ticker::BtcUsd, bucket, dec!(101.25)).await.unwrap();

    let range = BucketRange::new(Some(bucket), Some(bucket));
    assert_eq!(store.count(Ticker::BtcUsd, range).await.unwrap(), 1);
    let rows = store.range(Ticker::BtcUsd, range, 10, 0).await.unwrap();
    assert_eq!(rows[0].price, dec!(101.25));
}

#[tokio::test]
async fn test_advisory_lock_is_exclusive_across_sessions() {
    let Some(store) = store().await else { return };
    let key = 9_100_001;

    let mut first = store.open_session().await.unwrap();
    let mut second = store.open_session().await.unwrap();

    assert!(first.try_acquire(key).await.unwrap());
    assert!(!second.try_acquire(key).await.unwrap());

    first.release(key).await.unwrap();
    assert!(second.try_acquire(key).await.unwrap());

    second.release(key).await.unwrap();
    first.close().await.unwrap();
    second.close().await.unwrap();
}

#[tokio::test]
async fn test_closing_session_frees_lock() {
    let Some(store) = store().await else { return };
    let key = 9_100_002;

    let mut holder = store.open_session().await.unwrap();
    assert!(holder.try_acquire(key).await.unwrap());
    holder.close().await.unwrap();

    let mut next = store.open_session().await.unwrap();
    assert!(next.try_acquire(key).await.unwrap());
    next.release(key).await.unwrap();
    next.close().await.unwrap();
}

#[tokio::test]
async fn test_commit_bucket_and_range_order() {
    let Some(store) = store().await else { return };
    let from = BASE_BUCKET + 600;
    let to = from + 4 * 60;
    clear(&store, from, to).await;

    let mut session = store.open_session().await.unwrap();
    for bucket in [to, from, from + 120, from + 60] {
        session
            .commit_bucket(
                bucket,
                &[
                    Quote::new(Ticker::BtcUsd, dec!(42000)),
                    Quote::new(Ticker::EthUsd, dec!(2500)),
                ],
            )
            .await
            .unwrap();
    }
    session.close().await.unwrap();

    let range = BucketRange::new(Some(from), Some(to));
    let rows = store.range(Ticker::EthUsd, range, 10, 0).await.unwrap();
    let buckets: Vec<i64> = rows.iter().map(|r| r.bucket).collect();
    assert_eq!(buckets, vec![from, from + 60, from + 120, to]);

    let window = store.range(Ticker::EthUsd, range, 2, 1).await.unwrap();
    assert_eq!(window[0].bucket, from + 60);
    assert_eq!(window.len(), 2);
}

#[tokio::test]
async fn test_coordinator_run_persists_rounded_prices() {
    let Some(store) = store().await else { return };
    let store = Arc::new(store);
    let bucket = BASE_BUCKET + 3_000;
    clear(&store, bucket, bucket).await;

    let quotes = Arc::new(FixedQuotes::new(&[
        (Ticker::BtcUsd, dec!(42000.123456789012)),
        (Ticker::EthUsd, dec!(2500.5)),
    ]));
    let coordinator =
        IngestCoordinator::new(store.clone(), quotes).with_lock_key(9_100_003);

    let now = DateTime::from_timestamp(bucket + 42, 0).unwrap();
    let outcome = coordinator.run_ingestion_at(now).await.unwrap();
    assert!(matches!(outcome, IngestOutcome::Completed { bucket: b, .. } if b == bucket));

    let range = BucketRange::new(Some(bucket), Some(bucket));
    let btc = store.range(Ticker::BtcUsd, range, 1, 0).await.unwrap();
    assert_eq!(btc[0].price, dec!(42000.1234567890));
    let eth = store.range(Ticker::EthUsd, range, 1, 0).await.unwrap();
    assert_eq!(eth[0].price, dec!(2500.5));
}
