//! Prometheus metrics

use std::net::SocketAddr;
use std::time::Duration;

/// How an ingestion run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every ticker written
    Completed,
    /// Lock held by another instance
    Skipped,
    /// Aborted, nothing written
    Failed,
}

impl RunOutcome {
    fn label(&self) -> &'static str {
        match self {
            RunOutcome::Completed => "completed",
            RunOutcome::Skipped => "skipped",
            RunOutcome::Failed => "failed",
        }
    }
}

/// Count one ingestion run
pub fn record_run(outcome: RunOutcome) {
    metrics::counter!("price_ingest_runs_total", "outcome" => outcome.label()).increment(1);
}

/// Count one quote source failure by kind
pub fn record_quote_error(kind: &'static str) {
    metrics::counter!("price_quote_errors_total", "kind" => kind).increment(1);
}

/// Record wall time of a completed run
pub fn record_ingest_duration(duration: Duration) {
    metrics::histogram!("price_ingest_duration_ms").record(duration.as_secs_f64() * 1000.0);
}

/// Serve `/metrics` on the given port
pub fn install_exporter(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics exporter: {}", e))?;

    tracing::info!(%addr, "Prometheus exporter listening");
    Ok(())
}
