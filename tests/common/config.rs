//! Tracker configuration for tests against a mock backend

use std::time::Duration;

use pdftrans::{Config, JobTracker, PollConfig, RetryConfig};
use wiremock::MockServer;

/// Config with millisecond poll timings pointing at `server`
pub fn test_config(server: &MockServer) -> Config {
    Config {
        base_url: server.uri(),
        poll: PollConfig {
            interval: Duration::from_millis(20),
            request_timeout: Duration::from_secs(2),
        },
        retry: RetryConfig {
            max_attempts: 2,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
            backoff_multiplier: 2.0,
            jitter: false,
            max_consecutive_poll_failures: None,
        },
        ..Config::default()
    }
}

/// Tracker talking HTTP to `server`
pub fn create_test_tracker(server: &MockServer) -> JobTracker {
    JobTracker::new(test_config(server)).unwrap()
}
