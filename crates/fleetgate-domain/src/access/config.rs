//! Configuration for the access evaluator.

use std::time::Duration;

/// Configuration for the access evaluator.
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Deadline for every call to the auth and users services.
    pub rpc_timeout: Duration,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            rpc_timeout: Duration::from_secs(5),
        }
    }
}

impl AccessConfig {
    /// Sets the RPC deadline.
    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }
}
