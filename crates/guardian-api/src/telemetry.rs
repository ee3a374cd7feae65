//! Logging and metrics setup for the server binary.

use anyhow::Context;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Install the global tracing subscriber. `RUST_LOG` wins over `config.level`.
pub fn init_tracing(config: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}

/// Install the process-wide Prometheus recorder and describe Guardian's
/// metrics.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    describe_metrics();
    Ok(handle)
}

fn describe_metrics() {
    metrics::describe_counter!(
        "guardian_prompts_total",
        "Prompts evaluated, labelled by verdict"
    );
    metrics::describe_counter!(
        "guardian_task_failures_total",
        "Tasks that did not pass, by negative verdict or error"
    );
    metrics::describe_counter!(
        "guardian_rate_limited_total",
        "Requests refused by the per-user quota"
    );
}
