//! Scheduled ingestion loop
//!
//! Fires the coordinator once per interval, aligned to the minute boundary.
//! Every process running a worker fires at the same moment; the advisory lock
//! lets exactly one of them do the work.

use super::{IngestCoordinator, IngestOutcome};
use crate::price::{minute_bucket, BUCKET_SECONDS};
use crate::quote::QuoteSource;
use crate::store::PriceStore;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};

/// Worker scheduling configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Time between runs
    pub interval: Duration,
    /// Extra attempts within one tick after a rate-limit error
    pub rate_limit_retries: u32,
    /// First backoff delay, doubled per attempt
    pub rate_limit_backoff: Duration,
    /// Start on the next minute boundary instead of immediately
    pub align_to_minute: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            rate_limit_retries: 1,
            rate_limit_backoff: Duration::from_secs(5),
            align_to_minute: true,
        }
    }
}

/// Drives an ingestion coordinator on a timer
pub struct IngestWorker<S, Q> {
    coordinator: Arc<IngestCoordinator<S, Q>>,
    config: WorkerConfig,
}

impl<S, Q> IngestWorker<S, Q>
where
    S: PriceStore,
    Q: QuoteSource,
{
    pub fn new(coordinator: Arc<IngestCoordinator<S, Q>>, config: WorkerConfig) -> Self {
        Self {
            coordinator,
            config,
        }
    }

    /// Run until `shutdown` resolves; an in-flight run always finishes first
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        let start = if self.config.align_to_minute {
            Instant::now() + until_next_minute()
        } else {
            Instant::now()
        };

        let mut ticks = interval_at(start, self.config.interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            tickers = ?self.coordinator.tickers(),
            "Ingestion worker started"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Ingestion worker shutting down");
                    break;
                }
                _ = ticks.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// One scheduled run, retrying rate-limit failures within the interval
    ///
    /// Returns `None` when the run failed; the error has already been logged.
    pub async fn tick(&self) -> Option<IngestOutcome> {
        let started = Instant::now();
        let mut attempt = 0;
        let mut delay = self.config.rate_limit_backoff;

        loop {
            match self.coordinator.run_ingestion().await {
                Ok(outcome) => return Some(outcome),
                Err(e)
                    if e.is_rate_limited()
                        && attempt < self.config.rate_limit_retries
                        && started.elapsed() + delay < self.config.interval =>
                {
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Quote source rate limited, backing off"
                    );
                    sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => {
                    tracing::error!(
                        kind = e.kind(),
                        error = %e,
                        "Ingestion run failed, next tick will retry"
                    );
                    return None;
                }
            }
        }
    }
}

fn until_next_minute() -> Duration {
    let now = Utc::now();
    let next_ms = (minute_bucket(now) + BUCKET_SECONDS) * 1000;
    let wait_ms = (next_ms - now.timestamp_millis()).max(0);
    Duration::from_millis(wait_ms as u64)
}
