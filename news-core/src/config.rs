use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Timing and retry policy for the whole client. All values have fixed
/// defaults; a JSON file can override them for development setups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Hard deadline for one data fetch.
    #[serde(with = "duration_ms")]
    pub fetch_timeout: Duration,
    /// Shorter deadline for the processing-status poll.
    #[serde(with = "duration_ms")]
    pub status_poll_timeout: Duration,
    #[serde(with = "duration_ms")]
    pub status_poll_interval: Duration,
    /// Maximum fetch attempts per refresh cycle.
    pub max_retries: u32,
    /// First inter-attempt delay; doubles on every further retry.
    #[serde(with = "duration_ms")]
    pub base_backoff: Duration,
    /// Primary group (articles + latest) refresh period.
    #[serde(with = "duration_ms")]
    pub auto_refresh_interval: Duration,
    #[serde(with = "duration_ms")]
    pub trending_poll_interval: Duration,
    #[serde(with = "duration_ms")]
    pub dashboard_poll_interval: Duration,
    /// Window within which near-simultaneous triggers coalesce.
    #[serde(with = "duration_ms")]
    pub debounce: Duration,
    pub page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(5),
            status_poll_timeout: Duration::from_secs(3),
            status_poll_interval: Duration::from_secs(5),
            max_retries: 3,
            base_backoff: Duration::from_millis(500),
            auto_refresh_interval: Duration::from_secs(60),
            trending_poll_interval: Duration::from_secs(20 * 60),
            dashboard_poll_interval: Duration::from_secs(30 * 60),
            debounce: Duration::from_secs(1),
            page_size: 20,
        }
    }
}

impl ClientConfig {
    /// Load from a JSON file, falling back to defaults on any failure.
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(config) => config,
                Err(err) => {
                    warn!(error = %err, path = %path.display(), "invalid client config, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Backoff delay before retry `attempt` (1-based): 500ms, 1s, 2s, ...
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
