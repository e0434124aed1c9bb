//! Shared test doubles

use async_trait::async_trait;
use index_price_history::price::Ticker;
use index_price_history::quote::{QuoteError, QuoteSource};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;

/// Fixed prices per ticker, optionally slow, optionally failing one ticker
#[derive(Default)]
pub struct FixedQuotes {
    pub prices: HashMap<Ticker, Decimal>,
    pub failing: Option<(Ticker, QuoteError)>,
    pub delay: Duration,
}

impl FixedQuotes {
    pub fn new(prices: &[(Ticker, Decimal)]) -> Self {
        Self {
            prices: prices.iter().cloned().collect(),
            ..Default::default()
        }
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self, ticker: Ticker, err: QuoteError) -> Self {
        self.failing = Some((ticker, err));
        self
    }
}

#[async_trait]
impl QuoteSource for FixedQuotes {
    async fn index_price(&self, ticker: Ticker) -> Result<Decimal, QuoteError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some((failing, err)) = &self.failing {
            if *failing == ticker {
                return Err(err.clone());
            }
        }
        Ok(self.prices.get(&ticker).copied().unwrap_or(Decimal::ONE))
    }
}
