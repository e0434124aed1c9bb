//! In-process store with the same semantics as the Postgres backend
//!
//! Locks belong to sessions and are dropped with them, mirroring advisory
//! locks that die with their connection.

use super::{IngestSession, PriceStore, StoreError};
use crate::price::{BucketRange, PriceObservation, Quote, Ticker};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MemoryState {
    rows: BTreeMap<(Ticker, i64), PriceObservation>,
    /// Lock key to owning session id
    locks: HashMap<i64, u64>,
    reads: u64,
}

impl MemoryState {
    fn upsert(&mut self, ticker: Ticker, bucket: i64, price: Decimal) {
        self.rows.insert(
            (ticker, bucket),
            PriceObservation {
                ticker,
                bucket,
                price,
                recorded_at: Utc::now(),
            },
        );
    }

    fn matching(
        &self,
        ticker: Ticker,
        range: BucketRange,
    ) -> impl Iterator<Item = &PriceObservation> + '_ {
        self.rows
            .range((ticker, i64::MIN)..=(ticker, i64::MAX))
            .map(|(_, row)| row)
            .filter(move |row| range.contains(row.bucket))
    }
}

/// Price store held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryPriceStore {
    state: Arc<Mutex<MemoryState>>,
    next_session: Arc<AtomicU64>,
}

impl MemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        lock_state(&self.state)
    }

    /// Total rows across all tickers
    pub fn len(&self) -> usize {
        self.state().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of read operations served so far
    pub fn read_count(&self) -> u64 {
        self.state().reads
    }

    /// Whether any session currently holds the lock
    pub fn is_locked(&self, key: i64) -> bool {
        self.state().locks.contains_key(&key)
    }
}

fn lock_state(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl PriceStore for MemoryPriceStore {
    async fn open_session(&self) -> Result<Box<dyn IngestSession>, StoreError> {
        let id = self.next_session.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(MemorySession {
            id,
            state: Arc::clone(&self.state),
        }))
    }

    async fn upsert(&self, ticker: Ticker, bucket: i64, price: Decimal) -> Result<(), StoreError> {
        self.state().upsert(ticker, bucket, price);
        Ok(())
    }

    async fn count(&self, ticker: Ticker, range: BucketRange) -> Result<u64, StoreError> {
        let mut state = self.state();
        state.reads += 1;
        Ok(state.matching(ticker, range).count() as u64)
    }

    async fn latest(&self, ticker: Ticker) -> Result<Option<PriceObservation>, StoreError> {
        let mut state = self.state();
        state.reads += 1;
        Ok(state.matching(ticker, BucketRange::all()).last().cloned())
    }

    async fn range(
        &self,
        ticker: Ticker,
        range: BucketRange,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PriceObservation>, StoreError> {
        let mut state = self.state();
        state.reads += 1;
        Ok(state
            .matching(ticker, range)
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

struct MemorySession {
    id: u64,
    state: Arc<Mutex<MemoryState>>,
}

#[async_trait]
impl IngestSession for MemorySession {
    async fn try_acquire(&mut self, key: i64) -> Result<bool, StoreError> {
        let mut state = lock_state(&self.state);
        match state.locks.get(&key) {
            Some(owner) => Ok(*owner == self.id),
            None => {
                state.locks.insert(key, self.id);
                Ok(true)
            }
        }
    }

    async fn release(&mut self, key: i64) -> Result<(), StoreError> {
        let mut state = lock_state(&self.state);
        if state.locks.get(&key) == Some(&self.id) {
            state.locks.remove(&key);
        }
        Ok(())
    }

    async fn commit_bucket(&mut self, bucket: i64, quotes: &[Quote]) -> Result<(), StoreError> {
        // Single critical section, so readers see all quotes or none
        let mut state = lock_state(&self.state);
        for quote in quotes {
            state.upsert(quote.ticker, bucket, quote.price);
        }
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        let id = self.id;
        lock_state(&self.state).locks.retain(|_, owner| *owner != id);
    }
}
