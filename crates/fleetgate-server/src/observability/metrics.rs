//! Prometheus metrics infrastructure.
//!
//! Metrics are recorded through the `metrics` facade and exported with
//! `metrics-exporter-prometheus`.
//!
//! # Metrics Exposed
//!
//! - `fleetgate_service_requests_total` - Service calls by method and status
//! - `fleetgate_service_request_duration_seconds` - Service call duration histogram
//! - `fleetgate_cache_hits_total` - Lookaside cache hits by cache kind
//! - `fleetgate_cache_misses_total` - Lookaside cache misses by cache kind

use std::sync::Arc;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Shared handle for rendering the collected metrics.
#[derive(Clone)]
pub struct MetricsState {
    handle: Arc<PrometheusHandle>,
}

impl MetricsState {
    pub fn new(handle: PrometheusHandle) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    /// Renders the current metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl std::fmt::Debug for MetricsState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsState").finish_non_exhaustive()
    }
}

/// Error type for metrics initialization.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("failed to install Prometheus recorder: recorder already installed")]
    AlreadyInstalled,
}

/// Installs the Prometheus recorder and describes every fleetgate metric.
///
/// Must be called once, before anything is recorded.
///
/// # Errors
///
/// Returns an error if a recorder is already installed.
pub fn init_metrics() -> Result<MetricsState, MetricsError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|_| MetricsError::AlreadyInstalled)?;

    register_default_metrics();

    Ok(MetricsState::new(handle))
}

fn register_default_metrics() {
    metrics::describe_counter!(
        "fleetgate_service_requests_total",
        "Total number of service calls"
    );
    metrics::describe_histogram!(
        "fleetgate_service_request_duration_seconds",
        "Service call duration in seconds"
    );

    fleetgate_domain::cache::register_cache_metrics();
}
