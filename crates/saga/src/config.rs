//! Document service configuration.

use std::time::Duration;

const DEFAULT_STEP_TIMEOUT_MS: u64 = 5_000;

/// Runtime settings for the document service.
///
/// Reads from environment variables:
/// - `DOCUMENT_STEP_TIMEOUT_MS`: limit for each remote call (default: `5000`)
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub step_timeout: Duration,
}

impl ServiceConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let step_timeout = std::env::var("DOCUMENT_STEP_TIMEOUT_MS")
            .ok()
            .and_then(|ms| ms.parse().ok())
            .filter(|ms: &u64| *ms > 0)
            .unwrap_or(DEFAULT_STEP_TIMEOUT_MS);
        Self {
            step_timeout: Duration::from_millis(step_timeout),
        }
    }

    pub fn with_step_timeout(mut self, step_timeout: Duration) -> Self {
        self.step_timeout = step_timeout;
        self
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            step_timeout: Duration::from_millis(DEFAULT_STEP_TIMEOUT_MS),
        }
    }
}
