use super::*;

#[tokio::test]
async fn test_transient_failures_do_not_change_state() {
    let backend = ScriptedBackend::new().script(
        "a.pdf",
        vec![
            Step::Report(StatusReport::progress(1, 4)),
            Step::Fail,
            Step::Fail,
            Step::Fail,
            Step::Report(StatusReport::new(JobState::Success)),
        ],
    );
    let (tracker, backend) = create_test_tracker(backend);
    let mut rx = tracker.subscribe();

    let id = tracker.submit(pdf("a.pdf"), params()).await.unwrap().local_id;
    let events = events_until_terminal(&mut rx, id).await;

    let transitions: Vec<(JobState, JobState)> = events
        .iter()
        .filter_map(|e| match e {
            Event::StateChanged { from, to, .. } => Some((*from, *to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        transitions,
        vec![
            (JobState::Pending, JobState::Progress),
            (JobState::Progress, JobState::Success),
        ],
        "failed queries must not produce transitions"
    );
    assert_eq!(backend.status_calls_for("a.pdf"), 5);
    assert!(tracker.job(id).await.unwrap().error.is_none());
}

#[tokio::test]
async fn test_backwards_report_is_ignored() {
    let backend = ScriptedBackend::new().script(
        "a.pdf",
        vec![
            Step::Report(StatusReport::progress(3, 10)),
            Step::Report(StatusReport::new(JobState::Pending)),
            Step::Report(StatusReport::progress(6, 10)),
            Step::Report(StatusReport::new(JobState::Success)),
        ],
    );
    let (tracker, _backend) = create_test_tracker(backend);
    let mut rx = tracker.subscribe();

    let id = tracker.submit(pdf("a.pdf"), params()).await.unwrap().local_id;
    let events = events_until_terminal(&mut rx, id).await;

    assert!(
        !events.iter().any(|e| matches!(
            e,
            Event::StateChanged {
                to: JobState::Pending,
                ..
            }
        )),
        "PROGRESS must never fall back to PENDING"
    );
    let progress: Vec<(u64, u64)> = events
        .iter()
        .filter_map(|e| match e {
            Event::Progress { current, total, .. } => Some((*current, *total)),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![(3, 10), (6, 10)]);
}

#[tokio::test]
async fn test_polling_stops_at_terminal_state() {
    let backend = ScriptedBackend::new().script(
        "a.pdf",
        vec![Step::Report(StatusReport::new(JobState::Success))],
    );
    let (tracker, backend) = create_test_tracker(backend);

    let id = tracker.submit(pdf("a.pdf"), params()).await.unwrap().local_id;
    tracker.wait_for_terminal(id, WAIT).await.unwrap();
    let calls = backend.status_calls_for("a.pdf");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        backend.status_calls_for("a.pdf"),
        calls,
        "no queries after a terminal state"
    );
    assert_eq!(calls, 1);
}

#[tokio::test]
async fn test_backend_failure_detail_is_verbatim() {
    let backend = ScriptedBackend::new().script(
        "a.pdf",
        vec![Step::Report(StatusReport::failure(
            "Translation failed: font not found",
        ))],
    );
    let (tracker, _backend) = create_test_tracker(backend);
    let mut rx = tracker.subscribe();

    let id = tracker.submit(pdf("a.pdf"), params()).await.unwrap().local_id;
    let events = events_until_terminal(&mut rx, id).await;

    let job = tracker.job(id).await.unwrap();
    assert_eq!(job.state, JobState::Failure);
    let error = job.error.unwrap();
    assert_eq!(error.code, "backend_failure");
    assert_eq!(error.message, "Translation failed: font not found");
    assert!(
        events.iter().any(|e| matches!(e, Event::Failed { .. })),
        "backend failure emits Failed"
    );
}

#[tokio::test]
async fn test_poll_failure_cap_fails_the_job() {
    let backend = ScriptedBackend::new().script("a.pdf", vec![Step::Fail]);
    let mut config = fast_config();
    config.retry.max_consecutive_poll_failures = Some(3);
    let (tracker, backend) = create_test_tracker_with(config, backend);

    let id = tracker.submit(pdf("a.pdf"), params()).await.unwrap().local_id;
    let job = tracker.wait_for_terminal(id, WAIT).await.unwrap();

    assert_eq!(job.state, JobState::Failure);
    assert!(!job.polling);
    let error = job.error.unwrap();
    assert_eq!(error.code, "poll_exhausted");
    assert_eq!(
        error.details,
        Some(serde_json::json!({ "consecutive_failures": 3 }))
    );
    assert_eq!(backend.status_calls_for("a.pdf"), 3);
}

#[tokio::test]
async fn test_without_cap_polling_continues_through_failures() {
    let backend = ScriptedBackend::new().script("a.pdf", vec![Step::Fail]);
    let (tracker, backend) = create_test_tracker(backend);

    let id = tracker.submit(pdf("a.pdf"), params()).await.unwrap().local_id;
    tokio::time::sleep(Duration::from_millis(150)).await;

    let job = tracker.job(id).await.unwrap();
    assert_eq!(job.state, JobState::Pending);
    assert!(job.polling);
    assert!(backend.status_calls_for("a.pdf") >= 3);
}

#[tokio::test]
async fn test_slow_status_query_times_out_as_transient() {
    let backend = ScriptedBackend::new().script(
        "a.pdf",
        vec![
            Step::Slow(
                Duration::from_secs(2),
                StatusReport::new(JobState::Failure),
            ),
            Step::Report(StatusReport::new(JobState::Success)),
        ],
    );
    let mut config = fast_config();
    config.poll.request_timeout = Duration::from_millis(50);
    let (tracker, _backend) = create_test_tracker_with(config, backend);

    let id = tracker.submit(pdf("a.pdf"), params()).await.unwrap().local_id;
    let job = tracker.wait_for_terminal(id, WAIT).await.unwrap();

    assert_eq!(
        job.state,
        JobState::Success,
        "the timed-out FAILURE answer must never be applied"
    );
}

#[tokio::test]
async fn test_wait_for_terminal_times_out() {
    let (tracker, _backend) = create_test_tracker(ScriptedBackend::new());
    let id = tracker.submit(pdf("a.pdf"), params()).await.unwrap().local_id;

    let err = tracker
        .wait_for_terminal(id, Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
}

#[tokio::test]
async fn test_backend_revoke_emits_cancelled_like_local_cancel() {
    let backend = ScriptedBackend::new().script(
        "a.pdf",
        vec![
            Step::Report(StatusReport::progress(1, 4)),
            Step::Report(StatusReport::new(JobState::Revoked)),
        ],
    );
    let (tracker, _backend) = create_test_tracker(backend);
    let mut rx = tracker.subscribe();

    let id = tracker.submit(pdf("a.pdf"), params()).await.unwrap().local_id;
    let events = events_until_terminal(&mut rx, id).await;
    assert_eq!(
        events.last(),
        Some(&Event::StateChanged {
            id,
            from: JobState::Progress,
            to: JobState::Revoked,
        })
    );

    let next = tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for events")
        .expect("event channel closed");
    assert_eq!(next, Event::Cancelled { id });
    assert_eq!(tracker.job(id).await.unwrap().state, JobState::Revoked);
    assert!(!tracker.job(id).await.unwrap().polling);
}
