//! Poll cycles against a scripted provider.

mod common;

use common::{FakeProvider, RecordingSink, auth_error, monitor, schedule};
use courtwatch_providers::{ErrorCategory, ProviderError};
use courtwatch_server::PollPhase;

#[tokio::test]
async fn notifies_only_slots_that_open_after_the_baseline() {
    let provider = FakeProvider::new();
    provider.push_schedule(schedule(&["A", "B"]));
    provider.push_schedule(schedule(&["A", "B", "C"]));
    provider.push_schedule(schedule(&["B", "C"]));
    provider.push_schedule(schedule(&["A", "B", "C"]));
    let sink = RecordingSink::new("recording");
    let mut monitor = monitor(provider.clone(), &[sink.clone()]);

    let first = monitor.run_cycle().await.unwrap();
    assert!(first.baseline);
    assert_eq!(first.fetched, 2);
    assert!(first.dispatch.is_none());
    assert!(sink.messages().is_empty());

    let second = monitor.run_cycle().await.unwrap();
    assert!(!second.baseline);
    assert_eq!(second.opened, 1);
    let messages = sink.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Court C"));

    let third = monitor.run_cycle().await.unwrap();
    assert_eq!(third.opened, 0);
    assert_eq!(third.closed, 1);
    assert_eq!(sink.messages().len(), 1);

    let fourth = monitor.run_cycle().await.unwrap();
    assert_eq!(fourth.opened, 1);
    let messages = sink.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[1].contains("Court A"));

    assert_eq!(provider.logins(), 1);
    assert_eq!(monitor.cycle(), 4);
}

#[tokio::test]
async fn unchanged_schedule_sends_nothing() {
    let provider = FakeProvider::new();
    provider.push_schedule(schedule(&["A", "B"]));
    provider.push_schedule(schedule(&["B", "A"]));
    let sink = RecordingSink::new("recording");
    let mut monitor = monitor(provider, &[sink.clone()]);

    monitor.run_cycle().await.unwrap();
    let report = monitor.run_cycle().await.unwrap();

    assert_eq!(report.opened, 0);
    assert_eq!(report.closed, 0);
    assert!(report.dispatch.is_none());
    assert!(sink.messages().is_empty());
}

#[tokio::test]
async fn empty_baseline_then_openings_notify() {
    let provider = FakeProvider::new();
    provider.push_schedule(schedule(&[]));
    provider.push_schedule(schedule(&["A", "B"]));
    let sink = RecordingSink::new("recording");
    let mut monitor = monitor(provider, &[sink.clone()]);

    assert!(monitor.run_cycle().await.unwrap().baseline);
    let report = monitor.run_cycle().await.unwrap();

    assert!(!report.baseline);
    assert_eq!(report.opened, 2);
    assert_eq!(sink.messages().len(), 2);
}

#[tokio::test]
async fn failing_sink_does_not_starve_the_others() {
    let provider = FakeProvider::new();
    provider.push_schedule(schedule(&["A"]));
    provider.push_schedule(schedule(&["A", "B", "C"]));
    let broken = RecordingSink::failing("broken");
    let healthy = RecordingSink::new("healthy");
    let mut monitor = monitor(provider, &[broken, healthy.clone()]);

    monitor.run_cycle().await.unwrap();
    let report = monitor.run_cycle().await.unwrap();

    assert_eq!(healthy.messages().len(), 2);
    let dispatch = report.dispatch.expect("openings are dispatched");
    assert!(!dispatch.all_delivered());
    assert_eq!(dispatch.failed_sinks(), vec!["broken"]);
    assert!(dispatch.outcome("healthy").unwrap().is_success());

    let snapshot = monitor.snapshot();
    assert_eq!(snapshot.read().await.len(), 3);
}

#[tokio::test]
async fn failed_fetch_keeps_previous_snapshot() {
    let provider = FakeProvider::new();
    provider.push_schedule(schedule(&["A", "B"]));
    provider.push_schedule(Err(ProviderError::invalid_response("unexpected body")));
    provider.push_schedule(schedule(&["A", "B", "C"]));
    let sink = RecordingSink::new("recording");
    let mut monitor = monitor(provider, &[sink.clone()]);

    monitor.run_cycle().await.unwrap();
    let before = monitor.snapshot().read().await.slot_ids();

    let err = monitor.run_cycle().await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Parse);
    {
        let snapshot = monitor.snapshot();
        let store = snapshot.read().await;
        assert_eq!(store.slot_ids(), before);
        assert_eq!(store.generation(), 1);
    }

    let report = monitor.run_cycle().await.unwrap();
    assert_eq!(report.opened, 1);
    let messages = sink.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Court C"));
}

#[tokio::test]
async fn expired_session_is_renewed_within_the_cycle() {
    let provider = FakeProvider::new();
    provider.push_schedule(schedule(&["A"]));
    provider.push_schedule(Err(ProviderError::session_expired("token revoked")));
    provider.push_schedule(schedule(&["A", "B"]));
    let sink = RecordingSink::new("recording");
    let mut monitor = monitor(provider.clone(), &[sink.clone()]);

    monitor.run_cycle().await.unwrap();
    let report = monitor.run_cycle().await.unwrap();

    assert_eq!(report.opened, 1);
    assert_eq!(provider.logins(), 2);
    assert_eq!(provider.fetches(), 3);
    assert_eq!(sink.messages().len(), 1);
}

#[tokio::test]
async fn rejected_login_leaves_snapshot_untouched() {
    let provider = FakeProvider::new();
    provider.push_login(Err(auth_error()));
    let sink = RecordingSink::new("recording");
    let mut monitor = monitor(provider.clone(), &[sink.clone()]);

    let err = monitor.run_cycle().await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Auth);
    assert_eq!(monitor.phase(), PollPhase::Authenticating);
    assert_eq!(provider.fetches(), 0);
    assert!(monitor.snapshot().read().await.is_first_cycle());
    assert!(sink.messages().is_empty());
}

#[tokio::test]
async fn completed_cycle_ends_in_notifying_phase() {
    let provider = FakeProvider::new();
    provider.push_schedule(schedule(&["A"]));
    let mut monitor = monitor(provider, &[]);
    let phases = monitor.phases();
    assert_eq!(*phases.borrow(), PollPhase::Idle);

    let report = monitor.run_cycle().await.unwrap();

    assert_eq!(*phases.borrow(), PollPhase::Notifying);
    assert_eq!(monitor.current_window(), Some(report.window));
}
