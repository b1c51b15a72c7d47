//! Log output for a fleetgate process.
//!
//! The `logging` settings pick a format and a default level; `RUST_LOG`
//! overrides the level when set. JSON output is one flattened event per line:
//!
//! ```json
//! {"timestamp":"2026-01-15T10:30:00.000Z","level":"INFO","target":"fleetgate::service","message":"request completed","method":"identify","duration_ms":1}
//! ```

use tracing::{Level, Subscriber};
use tracing_subscriber::{fmt, fmt::MakeWriter, prelude::*, EnvFilter};

/// Output format of the process-wide subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Compact single-line text.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Used when `RUST_LOG` is unset.
    pub level: Level,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new(LogFormat::Text, Level::INFO)
    }
}

impl LoggingConfig {
    pub fn new(format: LogFormat, level: Level) -> Self {
        Self { format, level }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled,
}

/// Builds a subscriber writing `format` output to `writer`.
fn build_subscriber<W>(
    format: LogFormat,
    filter: EnvFilter,
    writer: W,
    ansi: bool,
) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => Box::new(
            registry.with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_target(true)
                    .with_writer(writer),
            ),
        ),
        LogFormat::Text => Box::new(
            registry.with(
                fmt::layer()
                    .compact()
                    .with_ansi(ansi)
                    .with_target(true)
                    .with_writer(writer),
            ),
        ),
    }
}

/// Installs the process-wide subscriber writing to stdout.
///
/// # Errors
///
/// Fails if a global subscriber was installed earlier.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let subscriber = build_subscriber(config.format, config.filter(), std::io::stdout, true);
    tracing::subscriber::set_global_default(subscriber).map_err(|_| LoggingError::AlreadyInstalled)
}

/// A subscriber that records every event, at any level, into `writer`.
pub fn capture_subscriber<W>(format: LogFormat, writer: W) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    build_subscriber(format, EnvFilter::new("trace"), writer, false)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Collects written bytes in memory.
    #[derive(Clone, Default)]
    pub(crate) struct CaptureWriter {
        buffer: Arc<Mutex<Vec<u8>>>,
    }

    impl CaptureWriter {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn output(&self) -> String {
            String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CaptureWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.buffer.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CaptureWriter {
        type Writer = CaptureWriter;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_default_is_text_at_info() {
        let config = LoggingConfig::default();
        assert_eq!(config.format, LogFormat::Text);
        assert_eq!(config.level, Level::INFO);
    }

    /// Test: JSON events are flattened, one object per line
    #[test]
    fn test_json_events_are_flat() {
        let writer = CaptureWriter::new();

        tracing::subscriber::with_default(capture_subscriber(LogFormat::Json, writer.clone()), || {
            tracing::info!(target: "fleetgate::service", method = "identify", "request completed");
        });

        let output = writer.output();
        let line = output.lines().next().expect("one event");
        let json: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(json["level"], "INFO");
        assert_eq!(json["target"], "fleetgate::service");
        assert_eq!(json["method"], "identify");
        assert_eq!(json["message"], "request completed");
    }

    #[test]
    fn test_text_events_carry_target_and_fields() {
        let writer = CaptureWriter::new();

        tracing::subscriber::with_default(capture_subscriber(LogFormat::Text, writer.clone()), || {
            tracing::warn!(target: "fleetgate::service", method = "restore", "request failed");
        });

        let output = writer.output();
        assert!(output.contains("WARN"));
        assert!(output.contains("fleetgate::service"));
        assert!(output.contains("method=\"restore\""));
    }
}
