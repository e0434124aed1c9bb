//! Read API over an in-memory store

use index_price_history::api::{self, ApiState};
use index_price_history::price::Ticker;
use index_price_history::query::PriceQuery;
use index_price_history::store::{MemoryPriceStore, PriceStore};
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;

async fn spawn_api(store: Arc<MemoryPriceStore>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = ApiState::new(PriceQuery::new(store), 100);

    tokio::spawn(async move {
        api::serve(listener, state, std::future::pending()).await.unwrap();
    });

    format!("http://{addr}")
}

async fn seeded_store(rows: i64) -> Arc<MemoryPriceStore> {
    let store = Arc::new(MemoryPriceStore::new());
    for minute in 1..=rows {
        store
            .upsert(Ticker::BtcUsd, minute * 60, Decimal::new(minute * 11, 1))
            .await
            .unwrap();
    }
    store
}

async fn get(url: &str) -> (u16, Value) {
    let response = reqwest::get(url).await.unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_health() {
    let base = spawn_api(Arc::new(MemoryPriceStore::new())).await;
    let (status, body) = get(&format!("{base}/health")).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_list_envelope() {
    let base = spawn_api(seeded_store(3).await).await;

    let (status, body) = get(&format!("{base}/prices?ticker=btc_usd&limit=2&offset=0")).await;

    assert_eq!(status, 200);
    assert_eq!(body["count"], 3);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
    assert_eq!(body["results"][0]["ticker"], "btc_usd");
    assert_eq!(body["results"][0]["ts_unix"], 60);
    assert_eq!(body["results"][0]["price"], "1.1");
    assert_eq!(
        body["next"],
        format!("{base}/prices?limit=2&offset=2&ticker=btc_usd")
    );
    assert!(body["previous"].is_null());
}

#[tokio::test]
async fn test_list_uses_default_limit() {
    let base = spawn_api(seeded_store(3).await).await;
    let (status, body) = get(&format!("{base}/prices?ticker=btc_usd")).await;

    assert_eq!(status, 200);
    assert_eq!(body["results"].as_array().unwrap().len(), 3);
    assert!(body["next"].is_null());
}

#[tokio::test]
async fn test_invalid_ticker() {
    let base = spawn_api(Arc::new(MemoryPriceStore::new())).await;
    let (status, body) = get(&format!("{base}/prices?ticker=nope")).await;

    assert_eq!(status, 422);
    assert_eq!(body["detail"]["error"], "invalid_ticker");
}

#[tokio::test]
async fn test_missing_ticker() {
    let base = spawn_api(Arc::new(MemoryPriceStore::new())).await;
    let (status, body) = get(&format!("{base}/prices")).await;

    assert_eq!(status, 422);
    assert_eq!(body["detail"]["error"], "invalid_params");
}

#[tokio::test]
async fn test_latest_not_found() {
    let base = spawn_api(Arc::new(MemoryPriceStore::new())).await;
    let (status, body) = get(&format!("{base}/prices/latest?ticker=btc_usd")).await;

    assert_eq!(status, 404);
    assert_eq!(body["detail"]["error"], "not_found");
}

#[tokio::test]
async fn test_latest_found() {
    let base = spawn_api(seeded_store(4).await).await;
    let (status, body) = get(&format!("{base}/prices/latest?ticker=btc_usd")).await;

    assert_eq!(status, 200);
    assert_eq!(body["ts_unix"], 240);
    assert_eq!(body["price"], "4.4");
}

#[tokio::test]
async fn test_range_validates_order() {
    let base = spawn_api(seeded_store(2).await).await;
    let (status, body) = get(&format!(
        "{base}/prices/range?ticker=btc_usd&from_ts=10&to_ts=1"
    ))
    .await;

    assert_eq!(status, 422);
    assert_eq!(body["detail"]["error"], "invalid_range");
}

#[tokio::test]
async fn test_range_envelope() {
    let base = spawn_api(seeded_store(5).await).await;
    let (status, body) = get(&format!(
        "{base}/prices/range?ticker=btc_usd&from_ts=120&to_ts=240&limit=2&offset=2"
    ))
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["count"], 3);
    assert_eq!(body["results"][0]["ts_unix"], 240);
    assert!(body["next"].is_null());
    assert_eq!(
        body["previous"],
        format!("{base}/prices/range?from_ts=120&limit=2&offset=0&ticker=btc_usd&to_ts=240")
    );
}

#[tokio::test]
async fn test_limit_above_max_rejected() {
    let base = spawn_api(seeded_store(1).await).await;
    let (status, body) = get(&format!("{base}/prices?ticker=btc_usd&limit=5000")).await;

    assert_eq!(status, 422);
    assert_eq!(body["detail"]["error"], "invalid_limit");
}
