//! Prometheus exporter for the bot's counters.
//!
//! | Series                               | Kind      | Labels    |
//! |--------------------------------------|-----------|-----------|
//! | `triage_store_runs_total`            | counter   | `store`   |
//! | `triage_store_effects_total`         | counter   | `store`   |
//! | `triage_store_in_flight`             | gauge     | `store`   |
//! | `triage_store_run_duration_seconds`  | histogram | `store`   |
//! | `triage_request_outcomes_total`      | counter   | `outcome` |
//! | `triage_voice_outcomes_total`        | counter   | `outcome` |
//!
//! Without an installed exporter every macro call is a no-op, which is how
//! the test suites run.
//!
//! ```rust,no_run
//! use triage_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use thiserror::Error;

/// Bucket bounds for run durations. A run is a handful of platform calls.
const RUN_DURATION_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Exporter setup failures.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// The exporter configuration was rejected
    #[error("invalid metrics exporter configuration: {0}")]
    Build(String),
}

/// Serves `/metrics` for Prometheus scraping.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Exporter that will listen on `addr` once started.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Install the global recorder and spawn the HTTP listener.
    ///
    /// Must be called from within a tokio runtime. If a recorder is already
    /// installed it is kept, and [`MetricsServer::render`] returns `None`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Build`] if the exporter cannot be built.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        describe_metrics();

        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                RUN_DURATION_BUCKETS,
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .build()
            .map_err(|e| MetricsError::Build(e.to_string()))?;
        let handle = recorder.handle();

        // Fails only when a recorder is already installed.
        if metrics::set_global_recorder(recorder).is_err() {
            tracing::warn!("Metrics recorder already installed, keeping it");
            return Ok(());
        }

        tokio::spawn(async move {
            if let Err(error) = exporter.await {
                tracing::error!(?error, "Metrics listener stopped");
            }
        });
        self.handle = Some(handle);
        tracing::info!(addr = %self.addr, "Metrics exporter listening");
        Ok(())
    }

    /// Current metrics in the Prometheus text format.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

fn describe_metrics() {
    describe_counter!("triage_store_runs_total", "Completed reducer runs");
    describe_counter!("triage_store_effects_total", "Effect futures executed by reducer runs");
    describe_gauge!("triage_store_in_flight", "Runs executing or waiting for their key");
    describe_histogram!(
        "triage_store_run_duration_seconds",
        metrics::Unit::Seconds,
        "Time a run held its key"
    );
    describe_counter!("triage_request_outcomes_total", "Request ticket runs by outcome");
    describe_counter!("triage_voice_outcomes_total", "Voice room runs by outcome");
}
