//! Quote source errors

use serde_json::Value;
use thiserror::Error;

/// JSON-RPC error codes Deribit uses for throttling
pub const RATE_LIMIT_CODES: [i64; 2] = [10028, 10029];

/// Code reported when a response is missing the fields we need
pub const SHAPE_ERROR_CODE: i64 = -1;

/// Quote source failures, one variant per kind
#[derive(Debug, Clone, Error, PartialEq)]
pub enum QuoteError {
    /// Non-2xx response or transport failure (status 0)
    #[error("quote source HTTP error {status}")]
    Http { status: u16, body: String },
    /// Structured error returned by the source
    #[error("quote source RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Value>,
    },
    /// Throttled by the source
    #[error("quote source rate limited {code}: {message}")]
    RateLimited {
        code: i64,
        message: String,
        data: Option<Value>,
    },
}

impl QuoteError {
    /// Classify a JSON-RPC error object by its code
    pub fn from_rpc(code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        let message = message.into();
        if RATE_LIMIT_CODES.contains(&code) {
            QuoteError::RateLimited {
                code,
                message,
                data,
            }
        } else {
            QuoteError::Rpc {
                code,
                message,
                data,
            }
        }
    }

    /// Response did not carry an index price
    pub fn unexpected_shape(data: Option<Value>) -> Self {
        QuoteError::Rpc {
            code: SHAPE_ERROR_CODE,
            message: "unexpected response shape".to_string(),
            data,
        }
    }

    /// Stable tag for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            QuoteError::Http { .. } => "http",
            QuoteError::Rpc { .. } => "rpc",
            QuoteError::RateLimited { .. } => "rate_limited",
        }
    }

    /// Worth retrying sooner than the next scheduled run
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, QuoteError::RateLimited { .. })
    }
}
