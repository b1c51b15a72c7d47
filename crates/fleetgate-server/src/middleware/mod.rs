//! Service decorators.
//!
//! Each decorator implements the full [`Service`](fleetgate_domain::Service)
//! API by forwarding to an inner `Arc<dyn Service>`, so they stack in any
//! order:
//!
//! ```ignore
//! let service: Arc<dyn Service> = Arc::new(fleet_service);
//! let service = Arc::new(MetricsService::new(service, metrics));
//! let service = Arc::new(LoggingService::new(service));
//! ```

mod logging;
mod metrics;

pub use logging::LoggingService;
pub use metrics::{MetricsService, ServiceMetrics};
