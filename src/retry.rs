//! Retry logic with exponential backoff
//!
//! Two consumers share the same back-off curve from [`RetryConfig`]:
//! - the status poller, which stretches its wait between queries while the
//!   backend keeps failing ([`Backoff`])
//! - artifact downloads, which retry transport errors a bounded number of
//!   times ([`with_retry`])
//!
//! # Example
//!
//! ```no_run
//! use pdftrans::retry::{IsRetryable, with_retry};
//! use pdftrans::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! let result = with_retry(&config, || async {
//!     Ok::<_, MyError>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, refused connections, 5xx responses) return `true`.
/// Permanent failures (4xx responses, bad configuration, state errors) return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Error::Timeout(_) => true,
            Error::PollTransient { .. } => true,
            // Backend overloaded or restarting
            Error::Api { status, .. } => *status >= 500 || *status == 429,
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
            ),
            Error::Config { .. }
            | Error::Submission(_)
            | Error::BackendFailure { .. }
            | Error::Cancelled(_)
            | Error::NotReady { .. }
            | Error::DuplicateJob(_)
            | Error::NotFound(_)
            | Error::InvalidState { .. }
            | Error::UnknownService(_)
            | Error::UnsupportedLocale(_)
            | Error::Url(_)
            | Error::Serialization(_)
            | Error::ShuttingDown => false,
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// Returns the successful result or the last error after `max_attempts` retries
/// (so at most `max_attempts + 1` calls).
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut backoff = Backoff::new(config);

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;
                let delay = backoff.next_delay();

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying"
                );

                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt + 1,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::debug!(error = %e, "Operation failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Exponential delay sequence capped at `max_delay`
///
/// Each call to [`next_delay`](Backoff::next_delay) returns the current delay
/// (jittered if configured) and grows the base for the next call.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    current: Duration,
    max: Duration,
    multiplier: f64,
    jitter: bool,
}

impl Backoff {
    /// Start a fresh sequence
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            initial: config.initial_delay,
            current: config.initial_delay,
            max: config.max_delay,
            multiplier: config.backoff_multiplier,
            jitter: config.jitter,
        }
    }

    /// Delay to wait now
    pub fn next_delay(&mut self) -> Duration {
        let delay = if self.jitter {
            add_jitter(self.current).min(self.max)
        } else {
            self.current
        };
        let next = Duration::from_secs_f64(self.current.as_secs_f64() * self.multiplier);
        self.current = next.min(self.max);
        delay
    }

    /// Return to the initial delay after a success
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// The result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
