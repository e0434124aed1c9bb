//! Integration tests

mod api_test;
mod deribit_test;
mod ingest_test;
mod postgres_test;
mod support;
