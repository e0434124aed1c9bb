//! Minute bucketing

use chrono::{DateTime, Utc};

/// Width of one bucket in seconds
pub const BUCKET_SECONDS: i64 = 60;

/// Map an instant to the start of its minute, in epoch seconds
pub fn minute_bucket(at: DateTime<Utc>) -> i64 {
    at.timestamp().div_euclid(BUCKET_SECONDS) * BUCKET_SECONDS
}

/// Bucket for the current wall-clock time
pub fn current_bucket() -> i64 {
    minute_bucket(Utc::now())
}
