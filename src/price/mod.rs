//! Price domain types
//!
//! Tracked tickers, minute buckets and the persisted observation row

mod bucket;
mod ticker;

pub use bucket::{current_bucket, minute_bucket, BUCKET_SECONDS};
pub use ticker::{Ticker, UnknownTicker};

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Fractional digits kept for stored prices (`NUMERIC(20, 10)`)
pub const PRICE_SCALE: u32 = 10;

/// One stored price per (ticker, bucket)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceObservation {
    pub ticker: Ticker,
    /// Minute-aligned epoch seconds
    #[serde(rename = "ts_unix")]
    pub bucket: i64,
    /// Serialized as a string so no precision is lost in JSON
    pub price: Decimal,
    /// Set by the store on insert and on every overwrite
    pub recorded_at: DateTime<Utc>,
}

/// A fetched price waiting to be written for a bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub ticker: Ticker,
    pub price: Decimal,
}

impl Quote {
    /// Build a quote, rounding the price to the storage scale
    ///
    /// Midpoints round away from zero, the same as a `NUMERIC` column cast.
    pub fn new(ticker: Ticker, price: Decimal) -> Self {
        Self {
            ticker,
            price: price
                .round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero)
                .normalize(),
        }
    }
}

/// Inclusive bucket bounds for count and range queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketRange {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl BucketRange {
    /// No bounds on either side
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(from: Option<i64>, to: Option<i64>) -> Self {
        Self { from, to }
    }

    /// Whether a bucket falls inside the bounds
    pub fn contains(&self, bucket: i64) -> bool {
        self.from.map_or(true, |from| bucket >= from) && self.to.map_or(true, |to| bucket <= to)
    }

    /// True when both bounds are set and `from > to`
    pub fn is_inverted(&self) -> bool {
        matches!((self.from, self.to), (Some(from), Some(to)) if from > to)
    }
}
