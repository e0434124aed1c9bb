//! Ingestion across concurrent coordinators

use crate::support::FixedQuotes;
use index_price_history::ingest::{IngestCoordinator, IngestOutcome, INGEST_LOCK_KEY};
use index_price_history::price::{BucketRange, Ticker};
use index_price_history::quote::QuoteError;
use index_price_history::store::{MemoryPriceStore, PriceStore};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_only_one_completes() {
    let store = Arc::new(MemoryPriceStore::new());
    let quotes = Arc::new(
        FixedQuotes::new(&[(Ticker::BtcUsd, dec!(42000)), (Ticker::EthUsd, dec!(2500))])
            .slow(Duration::from_millis(100)),
    );

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let coordinator = IngestCoordinator::new(store.clone(), quotes.clone());
            tokio::spawn(async move { coordinator.run_ingestion().await })
        })
        .collect();

    let mut completed = 0;
    let mut skipped = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            IngestOutcome::Completed { .. } => completed += 1,
            IngestOutcome::Skipped => skipped += 1,
        }
    }

    assert_eq!(completed, 1);
    assert_eq!(skipped, 4);
    assert!(!store.is_locked(INGEST_LOCK_KEY));
    for ticker in Ticker::ALL {
        assert_eq!(store.count(ticker, BucketRange::all()).await.unwrap(), 1);
    }
}

#[tokio::test]
async fn test_failed_run_releases_lock_for_next_run() {
    let store = Arc::new(MemoryPriceStore::new());
    let failing = Arc::new(FixedQuotes::new(&[]).failing(
        Ticker::EthUsd,
        QuoteError::Rpc {
            code: 10009,
            message: "invalid_argument".to_string(),
            data: None,
        },
    ));

    let err = IngestCoordinator::new(store.clone(), failing)
        .run_ingestion()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "rpc");
    assert!(store.is_empty());
    assert!(!store.is_locked(INGEST_LOCK_KEY));

    let outcome = IngestCoordinator::new(store.clone(), Arc::new(FixedQuotes::new(&[])))
        .run_ingestion()
        .await
        .unwrap();
    assert!(!outcome.is_skipped());
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_prices_rounded_to_storage_scale() {
    let store = Arc::new(MemoryPriceStore::new());
    let quotes = Arc::new(FixedQuotes::new(&[(Ticker::BtcUsd, dec!(0.123456789012345))]));

    IngestCoordinator::new(store.clone(), quotes)
        .with_tickers(vec![Ticker::BtcUsd])
        .run_ingestion()
        .await
        .unwrap();

    let latest = store.latest(Ticker::BtcUsd).await.unwrap().unwrap();
    assert_eq!(latest.price, dec!(0.1234567890));
}
