//! Configuration types for pdftrans

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Status polling configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between status queries for a healthy job (default: 2 seconds)
    #[serde(default = "default_poll_interval", with = "duration_millis_serde")]
    pub interval: Duration,

    /// Upper bound on a status, catalog or cancel request (default: 30 seconds)
    ///
    /// Also used as the connect timeout for file transfers.
    #[serde(default = "default_request_timeout", with = "duration_millis_serde")]
    pub request_timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Back-off applied after failed backend requests
///
/// The poller uses it to space out status queries while the backend is
/// unreachable; artifact downloads use it to retry transport errors.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts for artifact downloads (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_millis_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_millis_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,

    /// Consecutive failed status queries before a job is marked FAILURE
    ///
    /// `None` (the default) keeps polling indefinitely at `max_delay`.
    #[serde(default)]
    pub max_consecutive_poll_failures: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
            max_consecutive_poll_failures: None,
        }
    }
}

/// How a file reaches the translate endpoint
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitMode {
    /// Send the file inside the `/api/translate` form (default)
    #[default]
    Inline,
    /// Upload through `/api/upload` first, then pass `file_id` to `/api/translate`
    UploadFirst,
}

/// Main configuration for a [`JobTracker`](crate::JobTracker)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Backend base URL, without the `/api` prefix (default: "http://127.0.0.1:8000")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Status polling settings
    #[serde(default)]
    pub poll: PollConfig,

    /// Retry and back-off settings
    #[serde(default)]
    pub retry: RetryConfig,

    /// Submission mode
    #[serde(default)]
    pub submit_mode: SubmitMode,

    /// Upper bound on an upload, translate or download request (default: none)
    ///
    /// These are not limited by `poll.request_timeout`.
    #[serde(default, with = "optional_duration_millis_serde")]
    pub transfer_timeout: Option<Duration>,

    /// Ask the backend to cancel a task when the client cancels its job (default: true)
    #[serde(default = "default_true")]
    pub cancel_remote: bool,

    /// Where interface settings (locale) are persisted; `None` keeps them in memory
    #[serde(default)]
    pub settings_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            poll: PollConfig::default(),
            retry: RetryConfig::default(),
            submit_mode: SubmitMode::default(),
            transfer_timeout: None,
            cancel_remote: true,
            settings_path: None,
        }
    }
}

impl Config {
    /// Config pointing at the given backend with defaults for everything else
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Parse a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that would make the tracker misbehave
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.base_url).map_err(|e| Error::Config {
            message: format!("invalid base URL '{}': {}", self.base_url, e),
            key: Some("base_url".to_string()),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config {
                message: format!("unsupported URL scheme '{}'", url.scheme()),
                key: Some("base_url".to_string()),
            });
        }
        if self.poll.interval.is_zero() {
            return Err(Error::Config {
                message: "poll interval must be greater than zero".to_string(),
                key: Some("poll.interval".to_string()),
            });
        }
        if self.poll.request_timeout.is_zero() {
            return Err(Error::Config {
                message: "request timeout must be greater than zero".to_string(),
                key: Some("poll.request_timeout".to_string()),
            });
        }
        if self.transfer_timeout.is_some_and(|limit| limit.is_zero()) {
            return Err(Error::Config {
                message: "transfer timeout must be greater than zero".to_string(),
                key: Some("transfer_timeout".to_string()),
            });
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(Error::Config {
                message: format!(
                    "backoff multiplier must be at least 1.0, got {}",
                    self.retry.backoff_multiplier
                ),
                key: Some("retry.backoff_multiplier".to_string()),
            });
        }
        if self.retry.initial_delay > self.retry.max_delay {
            return Err(Error::Config {
                message: "initial retry delay exceeds max delay".to_string(),
                key: Some("retry.initial_delay".to_string()),
            });
        }
        if self.retry.max_consecutive_poll_failures == Some(0) {
            return Err(Error::Config {
                message: "max_consecutive_poll_failures must be at least 1".to_string(),
                key: Some("retry.max_consecutive_poll_failures".to_string()),
            });
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

// Durations are written as integer milliseconds
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

mod optional_duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
