use std::sync::Arc;

use tokio::sync::broadcast;

use super::context::ProgressTracker;
use super::guard::{ABORTED_KIND, ActiveJobGuard};
use crate::destination::DirectoryDestination;
use crate::engine::EngineProgress;
use crate::registry::JobRegistry;
use crate::types::{DownloadJob, Event, JobRequest, JobState};

fn tick(percent: f32, eta: Option<u64>) -> EngineProgress {
    EngineProgress {
        percent,
        eta_seconds: eta,
    }
}

// --- ProgressTracker ---

#[test]
fn test_tracker_accepts_increasing_values() {
    let mut tracker = ProgressTracker::default();
    assert_eq!(tracker.accept(tick(0.0, Some(30))), Some((0.0, Some(30))));
    assert_eq!(tracker.accept(tick(25.0, Some(20))), Some((25.0, Some(20))));
    assert_eq!(tracker.accept(tick(100.0, None)), Some((100.0, None)));
}

#[test]
fn test_tracker_raises_regressions_to_last_value() {
    let mut tracker = ProgressTracker::default();
    tracker.accept(tick(60.0, Some(10)));

    // A second stream (audio after video) restarts at 0 in engine output
    assert_eq!(tracker.accept(tick(3.0, Some(40))), Some((60.0, Some(40))));
}

#[test]
fn test_tracker_drops_exact_duplicates() {
    let mut tracker = ProgressTracker::default();
    assert!(tracker.accept(tick(42.0, Some(5))).is_some());
    assert!(tracker.accept(tick(42.0, Some(5))).is_none());
    // same percent, new ETA still counts
    assert!(tracker.accept(tick(42.0, Some(4))).is_some());
}

#[test]
fn test_tracker_clamps_out_of_range() {
    let mut tracker = ProgressTracker::default();
    assert_eq!(tracker.accept(tick(-5.0, None)), Some((0.0, None)));
    assert_eq!(tracker.accept(tick(250.0, None)), Some((100.0, None)));
    assert_eq!(tracker.accept(tick(f32::NAN, Some(1))), Some((100.0, Some(1))));
}

// --- ActiveJobGuard ---

fn registered_job(registry: &JobRegistry) -> crate::types::JobId {
    let request = JobRequest::new(
        "https://example.com/v",
        "none",
        "140",
        Arc::new(DirectoryDestination::new("/tmp")),
    );
    let id = registry.allocate_id();
    registry.register(DownloadJob::pending(id, &request));
    id
}

#[test]
fn test_release_unregisters_once_and_emits_idle() {
    let registry = Arc::new(JobRegistry::new());
    let (tx, mut rx) = broadcast::channel(16);
    let id = registered_job(&registry);

    let mut guard = ActiveJobGuard::new(id, registry.clone(), tx);
    guard.mark_completion_sent();
    guard.release();

    assert_eq!(registry.active_count(), 0);
    assert!(matches!(rx.try_recv().unwrap(), Event::Idle));
    assert!(rx.try_recv().is_err(), "release must not emit anything else");
}

#[test]
fn test_release_with_other_jobs_active_emits_nothing() {
    let registry = Arc::new(JobRegistry::new());
    let (tx, mut rx) = broadcast::channel(16);
    let first = registered_job(&registry);
    let _second = registered_job(&registry);

    ActiveJobGuard::new(first, registry.clone(), tx).release();

    assert_eq!(registry.active_count(), 1);
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_dropped_guard_fails_job_and_unregisters() {
    let registry = Arc::new(JobRegistry::new());
    let (tx, mut rx) = broadcast::channel(16);
    let id = registered_job(&registry);

    drop(ActiveJobGuard::new(id, registry.clone(), tx));

    assert_eq!(registry.active_count(), 0);
    let snapshot = registry.snapshot(id).unwrap();
    assert_eq!(snapshot.state, JobState::Failed);
    assert!(snapshot.finished_at.is_some());

    assert!(matches!(
        rx.try_recv().unwrap(),
        Event::StateChanged {
            state: JobState::Failed,
            ..
        }
    ));
    match rx.try_recv().unwrap() {
        Event::Completion(done) => {
            assert_eq!(done.job_id, id);
            assert!(!done.success);
            assert_eq!(done.error_kind.as_deref(), Some(ABORTED_KIND));
        }
        other => panic!("expected completion, got {other:?}"),
    }
    assert!(matches!(rx.try_recv().unwrap(), Event::Idle));
}

#[test]
fn test_dropped_guard_after_completion_does_not_duplicate_it() {
    let registry = Arc::new(JobRegistry::new());
    let (tx, mut rx) = broadcast::channel(16);
    let id = registered_job(&registry);

    let mut guard = ActiveJobGuard::new(id, registry.clone(), tx);
    guard.mark_completion_sent();
    drop(guard);

    assert_eq!(registry.active_count(), 0);
    assert!(matches!(rx.try_recv().unwrap(), Event::Idle));
    assert!(rx.try_recv().is_err());
}
