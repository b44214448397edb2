use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

use crate::error::AppError;

static PROMETHEUS: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder behind the `metrics` macros.
///
/// Idempotent: later calls keep the first recorder.
pub fn init_metrics() -> Result<(), AppError> {
    if PROMETHEUS.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Failed to install metrics recorder: {}", e)))?;

    let _ = PROMETHEUS.set(handle);
    Ok(())
}

/// Prometheus text exposition of everything recorded so far.
pub fn render_metrics() -> String {
    match PROMETHEUS.get() {
        Some(handle) => handle.render(),
        None => {
            tracing::warn!("Metrics requested before the recorder was installed");
            "# Metrics recorder not initialized\n".to_string()
        }
    }
}
