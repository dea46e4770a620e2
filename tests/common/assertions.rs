//! Custom test assertions for integration tests

use std::time::Duration;

use pdftrans::{Event, JobId, JobState, JobTracker};

/// Result of waiting for a job to finish
#[derive(Debug, PartialEq)]
pub enum WaitResult {
    /// Job reached SUCCESS
    Completed,
    /// Job reached FAILURE with this message
    Failed(String),
    /// Job was cancelled
    Cancelled,
    /// Timeout waiting for a terminal state
    Timeout,
    /// Channel closed unexpectedly
    ChannelClosed,
}

/// Wait for a job to reach a terminal state by following its events
pub async fn wait_for_completion(tracker: &JobTracker, id: JobId, timeout: Duration) -> WaitResult {
    let mut events = tracker.subscribe();

    // The job may have finished before we subscribed
    if let Some(job) = tracker.job(id).await {
        match job.state {
            JobState::Success => return WaitResult::Completed,
            JobState::Revoked => return WaitResult::Cancelled,
            JobState::Failure => {
                return WaitResult::Failed(job.error.map(|e| e.message).unwrap_or_default());
            }
            JobState::Pending | JobState::Progress => {}
        }
    }

    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::StateChanged {
                    id: event_id,
                    to: JobState::Success,
                    ..
                }) if event_id == id => return WaitResult::Completed,
                Ok(Event::Failed {
                    id: event_id,
                    error,
                }) if event_id == id => return WaitResult::Failed(error.message),
                Ok(Event::Cancelled { id: event_id }) if event_id == id => {
                    return WaitResult::Cancelled;
                }
                Ok(_) => continue,
                Err(_) => return WaitResult::ChannelClosed,
            }
        }
    })
    .await;

    result.unwrap_or(WaitResult::Timeout)
}

/// Collect events until `predicate` matches one (inclusive) or the timeout elapses
pub async fn collect_events_until<F>(
    events: &mut tokio::sync::broadcast::Receiver<Event>,
    timeout: Duration,
    mut predicate: F,
) -> Vec<Event>
where
    F: FnMut(&Event) -> bool,
{
    let mut collected = Vec::new();
    let _ = tokio::time::timeout(timeout, async {
        while let Ok(event) = events.recv().await {
            let done = predicate(&event);
            collected.push(event);
            if done {
                break;
            }
        }
    })
    .await;
    collected
}

/// Assert a job's current state
pub async fn assert_job_state(tracker: &JobTracker, id: JobId, expected: JobState) {
    let job = tracker
        .job(id)
        .await
        .unwrap_or_else(|| panic!("job {id} not found"));
    assert_eq!(
        job.state, expected,
        "job {id} expected {expected}, got {}",
        job.state
    );
}
