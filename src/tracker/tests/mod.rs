use super::test_helpers::*;
use super::*;
use crate::error::Error;
use crate::types::{ArtifactKind, Event, JobState, Progress, StatusReport};

mod polling;

/// Collect events for one job until it reaches a terminal state
async fn events_until_terminal(
    rx: &mut tokio::sync::broadcast::Receiver<Event>,
    id: JobId,
) -> Vec<Event> {
    let mut seen = Vec::new();
    loop {
        let event = tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for events")
            .expect("event channel closed");
        if event.job_id() != id {
            continue;
        }
        let done = matches!(
            event,
            Event::StateChanged { to, .. } if to.is_terminal()
        );
        seen.push(event);
        if done {
            return seen;
        }
    }
}
