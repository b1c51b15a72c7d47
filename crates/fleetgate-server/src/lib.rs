//! fleetgate-server: Configuration, observability and service wiring
//!
//! This crate assembles the fleetgate domain into a runnable service:
//! - Layered configuration (defaults, YAML file, `FLEETGATE_` environment)
//! - Structured logging and Prometheus metrics
//! - Logging and metrics decorators over the fleet service
//! - Classification of domain errors for transport front ends
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               fleetgate-server              │
//! ├─────────────────────────────────────────────┤
//! │  config/         - AppConfig loading        │
//! │  observability/  - Logging, metrics         │
//! │  middleware/     - Service decorators       │
//! │  errors/         - Error classification     │
//! │  app/            - Wiring                   │
//! └─────────────────────────────────────────────┘
//! ```

pub mod app;
pub mod config;
pub mod errors;
pub mod middleware;
pub mod observability;

pub use app::{App, AppBuilder, AppError};
pub use config::{AppConfig, ConfigLoadError};
pub use errors::{classify, ErrorKind};
