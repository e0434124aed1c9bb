//! HTTP read API
//!
//! `/prices`, `/prices/latest` and `/prices/range` over a [`PriceQuery`].

mod error;

pub use error::ApiError;

use crate::price::PriceObservation;
use crate::query::{Page, PriceQuery};
use crate::store::PriceStore;
use axum::extract::rejection::QueryRejection;
use axum::extract::{OriginalUri, Query, State};
use axum::http::header::HOST;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::future::Future;
use tokio::net::TcpListener;

/// Shared handler state
pub struct ApiState<S> {
    query: PriceQuery<S>,
    default_limit: u32,
}

impl<S> Clone for ApiState<S> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            default_limit: self.default_limit,
        }
    }
}

impl<S> ApiState<S> {
    pub fn new(query: PriceQuery<S>, default_limit: u32) -> Self {
        Self {
            query,
            default_limit,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListParams {
    ticker: String,
    limit: Option<u32>,
    offset: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RangeParams {
    ticker: String,
    from_ts: Option<i64>,
    to_ts: Option<i64>,
    limit: Option<u32>,
    offset: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct LatestParams {
    ticker: String,
}

/// Build the router
pub fn router<S>(state: ApiState<S>) -> Router
where
    S: PriceStore + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/prices", get(list_prices::<S>))
        .route("/prices/latest", get(latest_price::<S>))
        .route("/prices/range", get(list_prices_range::<S>))
        .with_state(state)
}

/// Serve the API on a bound listener until `shutdown` resolves
pub async fn serve<S>(
    listener: TcpListener,
    state: ApiState<S>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()>
where
    S: PriceStore + 'static,
{
    tracing::info!(addr = %listener.local_addr()?, "Read API listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Absolute URL of the incoming request, the base for pagination links
fn request_url(headers: &HeaderMap, uri: &OriginalUri) -> String {
    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let path = uri
        .0
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    format!("http://{host}{path}")
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_prices<S: PriceStore>(
    State(state): State<ApiState<S>>,
    uri: OriginalUri,
    headers: HeaderMap,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Page<PriceObservation>>, ApiError> {
    let Query(params) = params?;
    let url = request_url(&headers, &uri);

    let page = state
        .query
        .list_prices(
            &url,
            &params.ticker,
            params.limit.unwrap_or(state.default_limit),
            params.offset.unwrap_or(0),
        )
        .await?;

    Ok(Json(page))
}

async fn list_prices_range<S: PriceStore>(
    State(state): State<ApiState<S>>,
    uri: OriginalUri,
    headers: HeaderMap,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Result<Json<Page<PriceObservation>>, ApiError> {
    let Query(params) = params?;
    let url = request_url(&headers, &uri);

    let page = state
        .query
        .list_prices_range(
            &url,
            &params.ticker,
            params.from_ts,
            params.to_ts,
            params.limit.unwrap_or(state.default_limit),
            params.offset.unwrap_or(0),
        )
        .await?;

    Ok(Json(page))
}

async fn latest_price<S: PriceStore>(
    State(state): State<ApiState<S>>,
    params: Result<Query<LatestParams>, QueryRejection>,
) -> Result<Json<PriceObservation>, ApiError> {
    let Query(params) = params?;

    state
        .query
        .latest_price(&params.ticker)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("no price points for ticker"))
}
