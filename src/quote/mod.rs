//! Quote source
//!
//! Fetches the current index price for a ticker from Deribit's public API

mod deribit;
mod types;

pub use deribit::{parse_index_price, DeribitClient, DeribitConfig, DERIBIT_TESTNET_URL};
pub use types::{QuoteError, RATE_LIMIT_CODES, SHAPE_ERROR_CODE};

use crate::price::Ticker;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Trait for index price sources
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Current index price for one ticker
    async fn index_price(&self, ticker: Ticker) -> Result<Decimal, QuoteError>;
}
