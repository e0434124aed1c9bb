//! Deribit public API client
//!
//! Only `public/get_index_price` is used. The endpoint answers JSON-RPC style
//! envelopes: `{"result": {"index_price": ...}}` on success or
//! `{"error": {"code", "message", "data"}}` on failure.

use super::{QuoteError, QuoteSource};
use crate::price::Ticker;
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;

/// Deribit testnet API base URL
pub const DERIBIT_TESTNET_URL: &str = "https://test.deribit.com/api/v2";

/// Configuration for the Deribit client
#[derive(Debug, Clone)]
pub struct DeribitConfig {
    /// Base URL, without a trailing slash
    pub base_url: String,
    /// Whole-request timeout
    pub timeout: Duration,
}

impl Default for DeribitConfig {
    fn default() -> Self {
        Self {
            base_url: DERIBIT_TESTNET_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl DeribitConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Client for Deribit's public index price endpoint
pub struct DeribitClient {
    config: DeribitConfig,
    client: Client,
}

impl DeribitClient {
    /// Create a client with the given configuration
    pub fn new(config: DeribitConfig) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    /// Configured base URL
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    async fn fetch(&self, index_name: &str) -> Result<Decimal, QuoteError> {
        let url = format!("{}/public/get_index_price", self.config.base_url);

        tracing::debug!(url = %url, index_name, "Fetching index price");

        let response = self
            .client
            .get(&url)
            .query(&[("index_name", index_name)])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;

        parse_index_price(status, &body)
    }
}

#[async_trait]
impl QuoteSource for DeribitClient {
    async fn index_price(&self, ticker: Ticker) -> Result<Decimal, QuoteError> {
        self.fetch(ticker.as_str()).await
    }
}

fn transport_error(err: reqwest::Error) -> QuoteError {
    let status = err.status().map(|s| s.as_u16()).unwrap_or(0);
    let body = if err.is_timeout() {
        format!("request timed out: {}", err)
    } else {
        err.to_string()
    };
    QuoteError::Http { status, body }
}

/// Turn an HTTP status and body into a price or a classified error
pub fn parse_index_price(status: u16, body: &str) -> Result<Decimal, QuoteError> {
    if !(200..300).contains(&status) {
        return Err(QuoteError::Http {
            status,
            body: body.to_string(),
        });
    }

    let payload: Value =
        serde_json::from_str(body).map_err(|_| QuoteError::unexpected_shape(None))?;

    if let Some(error) = payload.get("error").filter(|e| is_present(e)) {
        let code = error
            .get("code")
            .and_then(rpc_code)
            .unwrap_or(super::SHAPE_ERROR_CODE);
        let message = match error.get("message") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let data = error.get("data").filter(|d| !d.is_null()).cloned();
        return Err(QuoteError::from_rpc(code, message, data));
    }

    payload
        .get("result")
        .and_then(|r| r.get("index_price"))
        .and_then(decimal_from_json)
        .ok_or_else(|| QuoteError::unexpected_shape(Some(payload.clone())))
}

/// Falsy values (`null`, `false`, zero, empty string, array or object) mean no error
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Error code as a JSON integer or a numeric string
fn rpc_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Convert a JSON number through its shortest text form, never through f64 math
fn decimal_from_json(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => decimal_from_text(&n.to_string()),
        Value::String(s) => decimal_from_text(s.trim()),
        _ => None,
    }
}

fn decimal_from_text(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}
