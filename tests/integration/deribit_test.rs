//! Deribit client against a local HTTP stub

use axum::extract::{RawQuery, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use index_price_history::price::Ticker;
use index_price_history::quote::{DeribitClient, DeribitConfig, QuoteError, QuoteSource};
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// Canned `get_index_price` endpoint that records the query strings it saw
#[derive(Clone)]
struct Stub {
    status: StatusCode,
    body: &'static str,
    delay: Duration,
    queries: Arc<Mutex<Vec<String>>>,
}

impl Stub {
    fn new(status: StatusCode, body: &'static str) -> Self {
        Self {
            status,
            body,
            delay: Duration::ZERO,
            queries: Arc::default(),
        }
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    /// Serve on an ephemeral port and return the API base URL
    async fn spawn(&self) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new()
            .route("/api/v2/public/get_index_price", get(index_price))
            .with_state(self.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{addr}/api/v2")
    }
}

async fn index_price(State(stub): State<Stub>, RawQuery(query): RawQuery) -> impl IntoResponse {
    stub.queries.lock().unwrap().push(query.unwrap_or_default());
    if !stub.delay.is_zero() {
        tokio::time::sleep(stub.delay).await;
    }
    (
        stub.status,
        [(header::CONTENT_TYPE, "application/json")],
        stub.body,
    )
}

fn client(base_url: &str, timeout: Duration) -> DeribitClient {
    DeribitClient::new(DeribitConfig::new(base_url).timeout(timeout)).unwrap()
}

#[tokio::test]
async fn test_fetches_index_price() {
    let stub = Stub::new(
        StatusCode::OK,
        r#"{"jsonrpc":"2.0","result":{"index_price":11628.81,"estimated_delivery_price":11628.81},"id":1}"#,
    );
    let url = stub.spawn().await;

    let price = client(&url, Duration::from_secs(5))
        .index_price(Ticker::BtcUsd)
        .await
        .unwrap();

    assert_eq!(price, dec!(11628.81));
    assert_eq!(stub.queries(), vec!["index_name=btc_usd".to_string()]);
}

#[tokio::test]
async fn test_rate_limit_response() {
    let url = Stub::new(
        StatusCode::OK,
        r#"{"jsonrpc":"2.0","error":{"code":10028,"message":"too_many_requests"},"id":1}"#,
    )
    .spawn()
    .await;

    let err = client(&url, Duration::from_secs(5))
        .index_price(Ticker::EthUsd)
        .await
        .unwrap_err();

    assert!(err.is_rate_limited());
}

#[tokio::test]
async fn test_server_error_is_http_kind() {
    let url = Stub::new(StatusCode::SERVICE_UNAVAILABLE, r#"{"message":"maintenance"}"#)
        .spawn()
        .await;

    let err = client(&url, Duration::from_secs(5))
        .index_price(Ticker::BtcUsd)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        QuoteError::Http {
            status: 503,
            body: r#"{"message":"maintenance"}"#.to_string()
        }
    );
}

#[tokio::test]
async fn test_timeout_is_http_kind() {
    let url = Stub::new(StatusCode::OK, r#"{"result":{"index_price":1}}"#)
        .delayed(Duration::from_secs(5))
        .spawn()
        .await;

    let err = client(&url, Duration::from_millis(200))
        .index_price(Ticker::BtcUsd)
        .await
        .unwrap_err();

    match err {
        QuoteError::Http { status, body } => {
            assert_eq!(status, 0);
            assert!(body.contains("timed out"));
        }
        other => panic!("expected http error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_refused_is_http_kind() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}"), Duration::from_secs(2))
        .index_price(Ticker::BtcUsd)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "http");
}
