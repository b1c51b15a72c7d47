//! Observability infrastructure for fleetgate.
//!
//! This module provides:
//! - Structured logging configuration
//! - Prometheus metrics recorder and rendering

mod logging;
mod metrics;

pub use logging::{capture_subscriber, init_logging, LogFormat, LoggingConfig, LoggingError};
pub use metrics::{init_metrics, MetricsError, MetricsState};

#[cfg(test)]
pub(crate) use logging::tests::CaptureWriter;
