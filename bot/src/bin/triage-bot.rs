//! Triage bot binary.
//!
//! Reads configuration from the environment (and `.env` when present),
//! starts logging and the optional Prometheus listener, then runs the
//! connector until Ctrl+C.

use triage_bot::config::Config;
use triage_bot::discord;
use triage_bot::telemetry::init_tracing;
use triage_runtime::metrics::MetricsServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(error) = dotenvy::dotenv() {
        if !error.not_found() {
            return Err(error.into());
        }
    }

    let config = Config::from_env()?;
    init_tracing(&config.log)?;
    tracing::info!(desk = ?config.desk, "Starting triage bot");

    if let Some(addr) = config.metrics_addr {
        MetricsServer::new(addr).start()?;
        tracing::info!(%addr, "Prometheus metrics available at /metrics");
    }

    discord::run(config).await?;
    tracing::info!("Triage bot stopped");
    Ok(())
}
