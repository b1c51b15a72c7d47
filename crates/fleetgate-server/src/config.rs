//! Configuration management for fleetgate.
//!
//! Configuration is layered from three sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! Environment variables take precedence over file values, which take
//! precedence over defaults.
//!
//! # Example
//!
//! ```ignore
//! use fleetgate_server::config::AppConfig;
//!
//! // Load from file with env overrides
//! let config = AppConfig::load("fleetgate.yaml")?;
//!
//! // Or load from environment only
//! let config = AppConfig::from_env()?;
//! ```

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use fleetgate_domain::{AccessConfig, CacheConfig};
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::observability::{LogFormat, LoggingConfig};

/// Environment variable prefix, e.g. `FLEETGATE_CACHE__ENABLED`.
const ENV_PREFIX: &str = "FLEETGATE";

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct AppConfig {
    /// Lookaside cache settings
    #[serde(default)]
    pub cache: CacheSettings,

    /// Access control settings
    #[serde(default)]
    pub access: AccessSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Metrics settings
    #[serde(default)]
    pub metrics: MetricsSettings,
}

/// Lookaside cache settings.
///
/// ```yaml
/// cache:
///   enabled: true
///   max_capacity: 100000
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CacheSettings {
    /// When disabled every lookup goes to the repositories.
    /// Environment variable: `FLEETGATE_CACHE__ENABLED`
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum entries held by each cache map.
    /// Environment variable: `FLEETGATE_CACHE__MAX_CAPACITY`
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_capacity: default_max_capacity(),
        }
    }
}

fn default_max_capacity() -> u64 {
    100_000
}

/// Access control settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AccessSettings {
    /// Deadline for each call to the auth and users services, in milliseconds.
    /// Environment variable: `FLEETGATE_ACCESS__RPC_TIMEOUT_MS`
    #[serde(default = "default_rpc_timeout_ms")]
    pub rpc_timeout_ms: u64,
}

impl Default for AccessSettings {
    fn default() -> Self {
        Self {
            rpc_timeout_ms: default_rpc_timeout_ms(),
        }
    }
}

fn default_rpc_timeout_ms() -> u64 {
    5_000
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format (true for production, false for development)
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MetricsSettings {
    /// Wrap the service in the metrics decorator
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl AppConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    ///
    /// Environment variables are prefixed with `FLEETGATE_` and use `__` as
    /// the nested key separator, e.g. `FLEETGATE_ACCESS__RPC_TIMEOUT_MS=250`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(env_source())
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config.validate()?;

        Ok(app_config)
    }

    /// Load configuration from defaults and environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(env_source())
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.cache.max_capacity == 0 {
            return Err(invalid("cache.max_capacity must be greater than 0"));
        }

        if self.access.rpc_timeout_ms == 0 {
            return Err(invalid("access.rpc_timeout_ms must be greater than 0"));
        }

        if !VALID_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(invalid(format!(
                "logging.level must be one of: {:?}, got: {}",
                VALID_LEVELS, self.logging.level
            )));
        }

        Ok(())
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::default()
            .with_enabled(self.cache.enabled)
            .with_max_capacity(self.cache.max_capacity)
    }

    pub fn access_config(&self) -> AccessConfig {
        AccessConfig::default().with_rpc_timeout(Duration::from_millis(self.access.rpc_timeout_ms))
    }

    pub fn logging_config(&self) -> LoggingConfig {
        let format = if self.logging.json {
            LogFormat::Json
        } else {
            LogFormat::Text
        };
        // validate() already rejects unknown levels
        let level = self
            .logging
            .level
            .to_lowercase()
            .parse::<Level>()
            .unwrap_or(Level::INFO);
        LoggingConfig::new(format, level)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

fn invalid(message: impl Into<String>) -> ConfigLoadError {
    ConfigLoadError::Invalid {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Test: Can load config from YAML file
    #[test]
    #[serial]
    fn test_can_load_config_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
cache:
  enabled: false
  max_capacity: 500

access:
  rpc_timeout_ms: 250

logging:
  level: debug
  json: true

metrics:
  enabled: false
"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();

        assert!(!config.cache.enabled);
        assert_eq!(config.cache.max_capacity, 500);
        assert_eq!(config.access.rpc_timeout_ms, 250);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert!(!config.metrics.enabled);
    }

    /// Test: Missing sections fall back to defaults
    #[test]
    #[serial]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
access:
  rpc_timeout_ms: 1000
"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();

        assert_eq!(config.access.rpc_timeout_ms, 1000);
        assert_eq!(config.cache, CacheSettings::default());
        assert_eq!(config.logging, LoggingSettings::default());
    }

    /// Test: Can override config with env vars
    #[test]
    #[serial]
    fn test_can_override_config_with_env_vars() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
cache:
  max_capacity: 10
logging:
  level: info
"#
        )
        .unwrap();

        std::env::set_var("FLEETGATE_CACHE__MAX_CAPACITY", "2048");
        std::env::set_var("FLEETGATE_LOGGING__LEVEL", "warn");

        let config = AppConfig::load(file.path());

        std::env::remove_var("FLEETGATE_CACHE__MAX_CAPACITY");
        std::env::remove_var("FLEETGATE_LOGGING__LEVEL");

        let config = config.unwrap();
        assert_eq!(config.cache.max_capacity, 2048);
        assert_eq!(config.logging.level, "warn");
        assert!(config.cache.enabled);
    }

    /// Test: from_env loads defaults with env overrides
    #[test]
    #[serial]
    fn test_from_env_loads_defaults_with_env_overrides() {
        std::env::set_var("FLEETGATE_ACCESS__RPC_TIMEOUT_MS", "750");

        let config = AppConfig::from_env();

        std::env::remove_var("FLEETGATE_ACCESS__RPC_TIMEOUT_MS");

        let config = config.unwrap();
        assert_eq!(config.access.rpc_timeout_ms, 750);
        assert_eq!(config.cache.max_capacity, 100_000);
    }

    /// Test: Config validation catches errors
    #[test]
    fn test_config_validation_catches_errors() {
        let mut config = AppConfig::default();
        config.cache.max_capacity = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cache.max_capacity"));

        let mut config = AppConfig::default();
        config.access.rpc_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("access.rpc_timeout_ms"));

        let mut config = AppConfig::default();
        config.logging.level = "verbose".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));

        let mut config = AppConfig::default();
        config.logging.level = "DEBUG".to_string();
        assert!(config.validate().is_ok());
    }

    /// Test: Invalid config returns clear error
    #[test]
    fn test_invalid_config_returns_clear_error() {
        let err = AppConfig::load("/nonexistent/path/fleetgate.yaml").unwrap_err();
        assert!(matches!(err, ConfigLoadError::FileNotFound { .. }));
        assert!(err.to_string().contains("not found"));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "cache: [unterminated").unwrap();
        let err = AppConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Load(_)));
    }

    /// Test: Default config is valid
    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());

        assert!(config.cache.enabled);
        assert_eq!(config.cache.max_capacity, 100_000);
        assert_eq!(config.access.rpc_timeout_ms, 5_000);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_settings_convert_to_domain_config() {
        let mut config = AppConfig::default();
        config.cache.enabled = false;
        config.cache.max_capacity = 42;
        config.access.rpc_timeout_ms = 125;
        config.logging.level = "debug".to_string();
        config.logging.json = true;

        let cache = config.cache_config();
        assert!(!cache.enabled);
        assert_eq!(cache.max_capacity, 42);
        assert_eq!(
            config.access_config().rpc_timeout,
            Duration::from_millis(125)
        );

        let logging = config.logging_config();
        assert_eq!(logging, LoggingConfig::new(LogFormat::Json, Level::DEBUG));
    }
}
