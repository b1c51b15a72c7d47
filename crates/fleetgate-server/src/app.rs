//! Application wiring.
//!
//! [`AppBuilder`] assembles the in-memory repositories, lookaside caches and
//! the fleet service from an [`AppConfig`] plus the injected external
//! collaborators, and wraps the result in the service decorators:
//!
//! ```text
//! LoggingService -> MetricsService (if enabled) -> FleetService
//! ```
//!
//! [`App::init_observability`] installs the process-wide log subscriber and
//! Prometheus recorder from the same configuration; call it once at startup.

use std::sync::Arc;

use fleetgate_domain::{
    AuthClient, Caches, FleetService, IdProvider, Repositories, Service, UsersClient,
    UuidProvider,
};
use fleetgate_storage::MemoryStore;
use tracing::info;

use crate::config::{AppConfig, ConfigLoadError};
use crate::middleware::{LoggingService, MetricsService, ServiceMetrics};
use crate::observability::{init_logging, init_metrics, LoggingError, MetricsError, MetricsState};

/// Error type for application assembly.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("missing collaborator: {name}")]
    MissingCollaborator { name: &'static str },

    #[error(transparent)]
    Config(#[from] ConfigLoadError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

/// A fully wired fleet service.
pub struct App {
    /// The decorated service.
    pub service: Arc<dyn Service>,
    /// Call metrics, present when the metrics decorator is enabled.
    pub metrics: Option<Arc<ServiceMetrics>>,
    /// The backing store.
    pub store: Arc<MemoryStore>,
    /// The caches shared by the service.
    pub caches: Caches,
}

impl App {
    pub fn builder(config: AppConfig) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// Installs logging per `config.logging` and, when metrics are enabled,
    /// the Prometheus recorder. Returns the handle for rendering metrics.
    ///
    /// # Errors
    ///
    /// Fails on an invalid configuration or when either global was
    /// already installed.
    pub fn init_observability(config: &AppConfig) -> Result<Option<MetricsState>, AppError> {
        config.validate()?;
        init_logging(&config.logging_config())?;

        let state = if config.metrics.enabled {
            Some(init_metrics()?)
        } else {
            None
        };

        info!(
            log_level = %config.logging.level,
            log_json = config.logging.json,
            metrics_enabled = config.metrics.enabled,
            "observability initialized"
        );
        Ok(state)
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

/// Builder for [`App`].
///
/// The auth and users clients are required. The ID provider defaults to
/// [`UuidProvider`] and the store to a fresh [`MemoryStore`].
pub struct AppBuilder {
    config: AppConfig,
    store: Option<Arc<MemoryStore>>,
    auth: Option<Arc<dyn AuthClient>>,
    users: Option<Arc<dyn UsersClient>>,
    ids: Option<Arc<dyn IdProvider>>,
}

impl AppBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            store: None,
            auth: None,
            users: None,
            ids: None,
        }
    }

    /// Use an existing store, e.g. one shared with a test double.
    pub fn with_store(mut self, store: Arc<MemoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_auth(mut self, auth: Arc<dyn AuthClient>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_users(mut self, users: Arc<dyn UsersClient>) -> Self {
        self.users = Some(users);
        self
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdProvider>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn build(self) -> Result<App, AppError> {
        self.config.validate()?;

        let auth = self
            .auth
            .ok_or(AppError::MissingCollaborator { name: "auth" })?;
        let users = self
            .users
            .ok_or(AppError::MissingCollaborator { name: "users" })?;
        let ids = self.ids.unwrap_or_else(|| Arc::new(UuidProvider));
        let store = self.store.unwrap_or_else(MemoryStore::new_shared);

        let caches = Caches::in_memory(&self.config.cache_config());
        let fleet = FleetService::new(
            Repositories::in_memory(Arc::clone(&store)),
            caches.clone(),
            auth,
            users,
            ids,
            self.config.access_config(),
        );

        let mut service: Arc<dyn Service> = Arc::new(fleet);
        let mut metrics = None;
        if self.config.metrics.enabled {
            let collected = Arc::new(ServiceMetrics::new());
            service = Arc::new(MetricsService::new(service, Arc::clone(&collected)));
            metrics = Some(collected);
        }
        let service: Arc<dyn Service> = Arc::new(LoggingService::new(service));

        info!(
            cache_enabled = self.config.cache.enabled,
            cache_capacity = self.config.cache.max_capacity,
            rpc_timeout_ms = self.config.access.rpc_timeout_ms,
            metrics_enabled = self.config.metrics.enabled,
            "fleet service assembled"
        );

        Ok(App {
            service,
            metrics,
            store,
            caches,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetgate_domain::testing::{MockAuthClient, MockUsersClient};
    use fleetgate_domain::ThingService;

    fn mocks(store: &Arc<MemoryStore>) -> (Arc<MockAuthClient>, Arc<MockUsersClient>) {
        (
            Arc::new(MockAuthClient::new(store.clone())),
            Arc::new(MockUsersClient::new()),
        )
    }

    #[test]
    fn test_build_requires_collaborators() {
        let err = App::builder(AppConfig::default()).build().unwrap_err();
        assert!(matches!(
            err,
            AppError::MissingCollaborator { name: "auth" }
        ));

        let store = MemoryStore::new_shared();
        let (auth, _) = mocks(&store);
        let err = App::builder(AppConfig::default())
            .with_auth(auth)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::MissingCollaborator { name: "users" }
        ));
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let store = MemoryStore::new_shared();
        let (auth, users) = mocks(&store);
        let mut config = AppConfig::default();
        config.access.rpc_timeout_ms = 0;

        let err = App::builder(config)
            .with_auth(auth)
            .with_users(users)
            .build()
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_metrics_decorator_follows_config() {
        let store = MemoryStore::new_shared();
        let (auth, users) = mocks(&store);
        let app = App::builder(AppConfig::default())
            .with_store(store.clone())
            .with_auth(auth.clone())
            .with_users(users.clone())
            .build()
            .unwrap();
        assert!(app.metrics.is_some());
        assert!(Arc::ptr_eq(&app.store, &store));

        let mut config = AppConfig::default();
        config.metrics.enabled = false;
        let app = App::builder(config)
            .with_auth(auth)
            .with_users(users)
            .build()
            .unwrap();
        assert!(app.metrics.is_none());
    }

    #[tokio::test]
    async fn test_built_service_counts_calls() {
        let store = MemoryStore::new_shared();
        let (auth, users) = mocks(&store);
        let app = App::builder(AppConfig::default())
            .with_store(store)
            .with_auth(auth)
            .with_users(users)
            .build()
            .unwrap();

        let _ = app.service.identify("missing").await;

        let metrics = app.metrics.unwrap();
        assert_eq!(metrics.request_count(), 1);
        assert_eq!(metrics.error_count(), 1);
    }

    /// Test: Observability installs once and exports service and cache metrics
    #[tokio::test]
    async fn test_init_observability_installs_globals_once() {
        let config = AppConfig::default();
        let state = App::init_observability(&config)
            .unwrap()
            .expect("metrics are enabled by default");

        let store = MemoryStore::new_shared();
        let (auth, users) = mocks(&store);
        let app = App::builder(config.clone())
            .with_store(store)
            .with_auth(auth)
            .with_users(users)
            .build()
            .unwrap();
        let _ = app.service.identify("missing").await;

        let rendered = state.render();
        assert!(rendered.contains("fleetgate_service_requests_total"));
        assert!(rendered.contains("method=\"identify\""));
        assert!(rendered.contains("fleetgate_cache_misses_total"));

        let again = App::init_observability(&config);
        assert!(matches!(again, Err(AppError::Logging(_))));
    }
}
