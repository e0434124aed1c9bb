//! index-price-history: per-minute index price ingestion and history queries
//!
//! This library provides the core components for:
//! - Minute bucketing of price observations
//! - Deribit index price client with a typed error taxonomy
//! - Postgres time-series store with session advisory locks
//! - Ingestion coordinator serialized across processes
//! - Paginated read queries and an HTTP read API
//! - Structured logging and Prometheus metrics

pub mod api;
pub mod cli;
pub mod config;
pub mod ingest;
pub mod price;
pub mod query;
pub mod quote;
pub mod store;
pub mod telemetry;
