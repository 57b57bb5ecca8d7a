//! Integration tests for the queue state machine.
//!
//! These drive a queue through whole runs, applying its recovery effects to
//! a real store on disk the way the CLI does.

use dlqueue_core::download::{FormatSelection, JobOutcome, ProgressEvent, ResultEvent};
use dlqueue_core::queue::{QueueExtras, QueueTally};
use dlqueue_core::{
    QueueEffect, QueueError, QueueEvent, QueueInput, QueueState, QueueStatus, RecoveryStore,
    RecoveryUpdate,
};
use tempfile::TempDir;

fn inputs(urls: &[&str]) -> Vec<QueueInput> {
    urls.iter().map(|url| QueueInput::from_url(*url)).collect()
}

fn setup_store() -> (RecoveryStore, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = RecoveryStore::new(temp_dir.path().join("unfinished.json"));
    (store, temp_dir)
}

/// Applies recovery effects and returns how many launches were requested.
fn run_effects(store: &RecoveryStore, effects: Vec<QueueEffect>) -> usize {
    let mut launches = 0;
    for effect in effects {
        match effect {
            QueueEffect::Launch(_) => launches += 1,
            QueueEffect::Recovery(update) => store.apply(update).expect("recovery write"),
            QueueEffect::StopProcess => {}
        }
    }
    launches
}

fn progress(state: &QueueState, percent: f64, destination: &str) -> QueueEvent {
    QueueEvent::Progress(ProgressEvent {
        job_id: state.active_job().expect("active job"),
        percent,
        speed: "3.00MiB/s".to_string(),
        eta: "00:10".to_string(),
        phase: "[download]".to_string(),
        destination: destination.to_string(),
        file_extension: "mp4".to_string(),
        queue_index: state.current_index(),
        queue_total: state.total(),
    })
}

fn finished(state: &QueueState, outcome: JobOutcome) -> QueueEvent {
    QueueEvent::Result(ResultEvent {
        job_id: state.active_job().expect("active job"),
        outcome,
        queue_index: state.current_index(),
        queue_total: state.total(),
    })
}

fn completed(state: &QueueState, destination: &str) -> QueueEvent {
    finished(
        state,
        JobOutcome::Completed {
            destination: Some(destination.to_string()),
        },
    )
}

fn failed(state: &QueueState) -> QueueEvent {
    finished(
        state,
        JobOutcome::Failed {
            message: "Download error: exit status 1".to_string(),
        },
    )
}

// ==================== Full runs ====================

#[test]
fn test_two_item_queue_completes_and_clears_recovery() {
    let (store, _temp_dir) = setup_store();
    let (state, effects) = QueueState::start(
        inputs(&["https://youtu.be/a", "https://youtu.be/b"]),
        FormatSelection::video("best"),
        "Talks",
        QueueExtras::default(),
    )
    .expect("start");
    assert_eq!(run_effects(&store, effects), 1);

    let entry = store
        .find_by_key("queue:Talks")
        .expect("load")
        .expect("entry recorded at start");
    assert_eq!(entry.urls.len(), 2);
    assert_eq!(entry.format_id, "best");
    assert_eq!(entry.desc.as_deref(), Some("2 items left"));

    let event = progress(&state, 55.0, "/tmp/a.mp4");
    let (state, effects) = state.reduce(event);
    assert!(effects.is_empty());
    assert_eq!(
        state.current_item().expect("item").destination.as_deref(),
        Some("/tmp/a.mp4")
    );

    let event = completed(&state, "/tmp/a.mp4");
    let (state, effects) = state.reduce(event);
    assert_eq!(run_effects(&store, effects), 1);
    assert_eq!(state.current_index(), 2);
    assert_eq!(state.item(1).expect("item 1").status, QueueStatus::Complete);
    assert_eq!(
        state.item(1).expect("item 1").destination.as_deref(),
        Some("/tmp/a.mp4")
    );
    let second = state.item(2).expect("item 2");
    assert_eq!(second.status, QueueStatus::Downloading);
    assert!(second.progress.abs() < f64::EPSILON);

    let entry = store
        .find_by_key("queue:Talks")
        .expect("load")
        .expect("entry still owed");
    assert_eq!(entry.urls, vec!["https://youtu.be/b".to_string()]);
    assert_eq!(entry.desc.as_deref(), Some("1 items left"));

    let event = completed(&state, "/tmp/b.mp4");
    let (state, effects) = state.reduce(event);
    assert_eq!(run_effects(&store, effects), 0);

    assert!(state.is_completed());
    assert!(!state.is_cancelled());
    assert!(store.load().expect("load").is_empty());
    assert_eq!(
        state.tally(),
        QueueTally {
            complete: 2,
            ..QueueTally::default()
        }
    );
}

#[test]
fn test_failure_halts_and_keeps_failed_item_owed() {
    let (store, _temp_dir) = setup_store();
    let (state, effects) = QueueState::start(
        inputs(&["https://youtu.be/a", "https://youtu.be/b", "https://youtu.be/c"]),
        FormatSelection::video("best"),
        "",
        QueueExtras::default(),
    )
    .expect("start");
    run_effects(&store, effects);

    let event = completed(&state, "/tmp/a.mp4");
    let (state, effects) = state.reduce(event);
    run_effects(&store, effects);

    let event = failed(&state);
    let (state, effects) = state.reduce(event);
    assert_eq!(run_effects(&store, effects), 0);

    assert!(state.is_halted());
    assert_eq!(state.current_index(), 2);
    assert_eq!(state.error(), Some("Download error: exit status 1"));
    assert_eq!(state.downloading_count(), 0);

    let entry = store
        .find_by_key("queue:Queued downloads")
        .expect("load")
        .expect("entry");
    assert_eq!(
        entry.urls,
        vec!["https://youtu.be/b".to_string(), "https://youtu.be/c".to_string()]
    );
}

#[test]
fn test_skip_after_failure_moves_on() {
    let (state, _) = QueueState::start(
        inputs(&["https://youtu.be/a", "https://youtu.be/b"]),
        FormatSelection::video("best"),
        "Skip",
        QueueExtras::default(),
    )
    .expect("start");

    let event = failed(&state);
    let (state, _) = state.reduce(event);
    let (state, effects) = state.reduce(QueueEvent::Skip);

    assert!(matches!(effects.last(), Some(QueueEffect::Launch(r)) if r.queue_index == 2));
    assert_eq!(state.item(1).expect("item 1").status, QueueStatus::Skipped);
    assert_eq!(state.error(), None);

    let event = completed(&state, "/tmp/b.mp4");
    let (state, effects) = state.reduce(event);
    assert!(state.is_completed());
    assert!(matches!(effects.as_slice(), [QueueEffect::Recovery(_)]));
    assert_eq!(state.tally().skipped, 1);
    assert_eq!(state.tally().complete, 1);
}

#[test]
fn test_cancel_single_item_leaves_it_resumable() {
    let (store, _temp_dir) = setup_store();
    let (state, effects) = QueueState::start(
        inputs(&["https://youtu.be/only"]),
        FormatSelection::audio("bestaudio", 192.0),
        "Solo",
        QueueExtras::default(),
    )
    .expect("start");
    run_effects(&store, effects);

    let (state, effects) = state.reduce(QueueEvent::Cancel);
    assert!(matches!(effects.last(), Some(QueueEffect::StopProcess)));
    run_effects(&store, effects);

    assert!(state.is_cancelled());
    assert!(state.is_finished());
    assert_eq!(state.active_job(), None);
    assert_eq!(state.item(1).expect("item").status, QueueStatus::Pending);

    let entry = store
        .find_by_key("queue:Solo")
        .expect("load")
        .expect("entry kept");
    assert_eq!(entry.urls, vec!["https://youtu.be/only".to_string()]);
    assert_eq!(entry.format_id, "bestaudio");
}

#[test]
fn test_cancel_leaves_finished_items_alone() {
    let (state, _) = QueueState::start(
        inputs(&[
            "https://youtu.be/1",
            "https://youtu.be/2",
            "https://youtu.be/3",
            "https://youtu.be/4",
        ]),
        FormatSelection::video("best"),
        "Mixed",
        QueueExtras::default(),
    )
    .expect("start");
    let event = completed(&state, "/tmp/1.mp4");
    let (state, _) = state.reduce(event);
    let event = failed(&state);
    let (state, _) = state.reduce(event);
    let (state, _) = state.reduce(QueueEvent::Skip);
    let event = failed(&state);
    let (state, _) = state.reduce(event);
    assert!(state.is_halted());

    let statuses = |state: &QueueState| -> Vec<QueueStatus> {
        state.items().iter().map(|item| item.status).collect()
    };
    let expected = vec![
        QueueStatus::Complete,
        QueueStatus::Skipped,
        QueueStatus::Error,
        QueueStatus::Pending,
    ];
    assert_eq!(statuses(&state), expected);

    let (state, effects) = state.reduce(QueueEvent::Cancel);

    assert!(state.is_cancelled());
    assert_eq!(statuses(&state), expected);
    assert_eq!(
        state.item(3).expect("item 3").error.as_deref(),
        Some("Download error: exit status 1")
    );
    match effects.as_slice() {
        [
            QueueEffect::Recovery(RecoveryUpdate::Upsert(entry)),
            QueueEffect::StopProcess,
        ] => assert_eq!(
            entry.urls,
            vec!["https://youtu.be/3".to_string(), "https://youtu.be/4".to_string()]
        ),
        other => panic!("unexpected effects: {other:?}"),
    }
}

#[test]
fn test_events_after_cancel_change_nothing() {
    let (state, _) = QueueState::start(
        inputs(&["https://youtu.be/a", "https://youtu.be/b"]),
        FormatSelection::video("best"),
        "Late",
        QueueExtras::default(),
    )
    .expect("start");
    let job = state.active_job().expect("job");

    let (state, _) = state.reduce(QueueEvent::Cancel);
    let snapshot = state.clone();

    let late = QueueEvent::Result(ResultEvent {
        job_id: job,
        outcome: JobOutcome::Cancelled,
        queue_index: 1,
        queue_total: 2,
    });
    let (state, effects) = state.reduce(late);
    assert!(effects.is_empty());
    let (state, effects) = state.reduce(QueueEvent::Retry);
    assert!(effects.is_empty());
    let (state, effects) = state.reduce(QueueEvent::Cancel);
    assert!(effects.is_empty());
    assert_eq!(state, snapshot);
}

#[test]
fn test_resume_from_recovery_entry_rebuilds_remaining_items() {
    let (store, _temp_dir) = setup_store();
    let (state, effects) = QueueState::start(
        inputs(&["https://youtu.be/a", "https://youtu.be/b", "https://youtu.be/c"]),
        FormatSelection::video("bv*+ba/b"),
        "Later",
        QueueExtras::default(),
    )
    .expect("start");
    run_effects(&store, effects);
    let event = completed(&state, "/tmp/a.mp4");
    let (state, effects) = state.reduce(event);
    run_effects(&store, effects);
    let (cancelled, effects) = state.reduce(QueueEvent::Cancel);
    run_effects(&store, effects);
    assert_eq!(cancelled.item(1).expect("item 1").status, QueueStatus::Complete);
    assert_eq!(cancelled.item(2).expect("item 2").status, QueueStatus::Pending);

    let entry = store.list().expect("list").into_iter().next().expect("entry");
    assert!(entry.is_queue());
    let (resumed, effects) = QueueState::start(
        entry.queue_inputs(),
        FormatSelection::video(entry.format_id.clone()),
        &entry.title,
        QueueExtras::default(),
    )
    .expect("restart");
    run_effects(&store, effects);

    assert_eq!(resumed.total(), 2);
    assert_eq!(resumed.label(), "Later");
    assert_eq!(resumed.item(1).expect("item").url, "https://youtu.be/b");
    assert_eq!(store.load().expect("load").len(), 1);
}

// ==================== Invariants ====================

#[test]
fn test_start_with_no_items_fails() {
    let result = QueueState::start(
        Vec::new(),
        FormatSelection::video("best"),
        "Empty",
        QueueExtras::default(),
    );
    assert!(matches!(result, Err(QueueError::EmptyQueue)));
}

#[test]
fn test_at_most_one_item_downloading_through_a_run() {
    let urls: Vec<String> = (1..=5).map(|i| format!("https://youtu.be/v{i}")).collect();
    let refs: Vec<&str> = urls.iter().map(String::as_str).collect();
    let (mut state, _) = QueueState::start(
        inputs(&refs),
        FormatSelection::video("best"),
        "Invariant",
        QueueExtras::default(),
    )
    .expect("start");

    let mut step = 0;
    while !state.is_finished() {
        assert!(state.downloading_count() <= 1);
        let event = if state.is_halted() {
            if step % 2 == 0 {
                QueueEvent::Retry
            } else {
                QueueEvent::Skip
            }
        } else if step % 3 == 1 {
            failed(&state)
        } else {
            completed(&state, "/tmp/out.mp4")
        };
        state = state.reduce(event).0;
        step += 1;
        assert!(step < 100, "queue did not finish");
    }
    assert_eq!(state.downloading_count(), 0);
    assert_eq!(state.remaining(), 0);
}

#[test]
fn test_error_keeps_current_index() {
    let (state, _) = QueueState::start(
        inputs(&["https://youtu.be/a", "https://youtu.be/b"]),
        FormatSelection::video("best"),
        "Index",
        QueueExtras::default(),
    )
    .expect("start");
    let event = failed(&state);
    let (state, _) = state.reduce(event);
    assert_eq!(state.current_index(), 1);
    assert_eq!(
        state.item(1).expect("item").error.as_deref(),
        Some("Download error: exit status 1")
    );
    assert_eq!(state.item(2).expect("item").status, QueueStatus::Pending);
}
