//! Editing session integration tests: timeline edits through the command
//! interface and their interaction with a running export.

mod common;

use common::{video_source, ScriptedEncoder, TestHarness};
use splitforge::sp_core::config::{Config, MutationPolicy};
use splitforge::sp_core::{CommandOutcome, Error, ExportState, TimelineCommand};
use splitforge::Applied;

fn spans(h: &TestHarness) -> Vec<(f64, f64)> {
    h.session
        .segments()
        .iter()
        .map(|s| (s.start, s.end))
        .collect()
}

// ---------------------------------------------------------------------------
// Command interface
// ---------------------------------------------------------------------------

#[tokio::test]
async fn json_commands_drive_the_timeline() {
    let h = TestHarness::new();
    h.session.load_source(video_source("v.mp4", 90.0)).await.unwrap();

    for json in [
        r#"{"op": "add", "time": 60}"#,
        r#"{"op": "add", "time": 30}"#,
        r#"{"op": "add", "time": 500}"#,
    ] {
        let cmd: TimelineCommand = serde_json::from_str(json).unwrap();
        h.session.apply(cmd).unwrap();
    }
    assert_eq!(
        spans(&h),
        vec![(0.0, 30.0), (30.0, 60.0), (60.0, 90.0), (90.0, 90.0)]
    );

    let cmd: TimelineCommand = serde_json::from_str(r#"{"op": "merge_delete", "index": 4}"#).unwrap();
    h.session.apply(cmd).unwrap();
    assert_eq!(spans(&h), vec![(0.0, 30.0), (30.0, 60.0), (60.0, 90.0)]);
}

#[tokio::test]
async fn labels_and_identity_survive_reordering() {
    let h = TestHarness::new();
    h.session.load_source(video_source("v.mp4", 100.0)).await.unwrap();

    let Applied::Now(CommandOutcome::Added(first)) = h.session.add_split_point(10.0).unwrap() else {
        panic!("expected immediate add");
    };
    h.session.add_split_point(50.0).unwrap();
    h.session.update_split_point(first, 80.0).unwrap();

    let timeline = h.session.timeline().unwrap();
    let points = timeline.points();
    assert_eq!(points[1].id, first);
    assert_eq!(points[1].time, 80.0);
    assert_eq!(points[1].label, "Split 1");
    assert_eq!(points[0].label, "Split 2");
}

#[tokio::test]
async fn unknown_ids_are_ignored() {
    let h = TestHarness::new();
    h.session.load_source(video_source("v.mp4", 10.0)).await.unwrap();
    h.session.add_split_point(5.0).unwrap();
    let before = spans(&h);

    let missing = splitforge::sp_core::SplitPointId::new();
    assert_eq!(
        h.session.update_split_point(missing, 1.0).unwrap(),
        Applied::Now(CommandOutcome::Ignored)
    );
    assert_eq!(
        h.session.remove_split_point(missing).unwrap(),
        Applied::Now(CommandOutcome::Ignored)
    );
    assert_eq!(
        h.session.delete_segment_by_merge(9).unwrap(),
        Applied::Now(CommandOutcome::Ignored)
    );
    assert_eq!(spans(&h), before);
}

// ---------------------------------------------------------------------------
// Mutation during export
// ---------------------------------------------------------------------------

#[tokio::test]
async fn edits_during_export_are_deferred() {
    let h = TestHarness::with(Config::default(), ScriptedEncoder::gated());
    h.session.load_source(video_source("v.mp4", 90.0)).await.unwrap();
    h.session.add_split_point(45.0).unwrap();

    let export = {
        let session = h.session.clone();
        tokio::spawn(async move { session.export_all().await })
    };

    h.encoder.entered.notified().await;
    assert!(h.session.is_exporting());
    assert_eq!(h.session.export_status().state, ExportState::Encoding);

    assert_eq!(h.session.add_split_point(10.0).unwrap(), Applied::Deferred);
    assert_eq!(h.session.delete_segment_by_merge(3).unwrap(), Applied::Deferred);
    assert_eq!(h.session.pending_commands(), 2);
    // Not applied yet.
    assert_eq!(spans(&h), vec![(0.0, 45.0), (45.0, 90.0)]);

    // A second export is refused outright.
    assert!(matches!(h.session.export_all().await, Err(Error::Busy(_))));

    h.encoder.release.notify_one();
    h.encoder.entered.notified().await;
    h.encoder.release.notify_one();
    let report = export.await.unwrap().unwrap();

    // The export used the frozen split set.
    assert_eq!(report.outputs.len(), 2);
    assert_eq!(*h.encoder.calls.lock(), vec![(0.0, 45.0), (45.0, 90.0)]);

    // Replayed in arrival order: the add creates a third segment, which the
    // merge then folds back into the second.
    assert_eq!(h.session.pending_commands(), 0);
    assert_eq!(spans(&h), vec![(0.0, 10.0), (10.0, 90.0)]);
    assert!(!h.session.is_exporting());
}

#[tokio::test]
async fn edits_during_export_can_be_rejected() {
    let mut config = Config::default();
    config.session.mutation_policy = MutationPolicy::Reject;
    let h = TestHarness::with(config, ScriptedEncoder::gated());
    h.session.load_source(video_source("v.mp4", 60.0)).await.unwrap();

    let export = {
        let session = h.session.clone();
        tokio::spawn(async move { session.export_all().await })
    };
    h.encoder.entered.notified().await;

    let err = h.session.add_split_point(30.0).unwrap_err();
    assert!(matches!(err, Error::Busy(_)));
    assert!(err.is_retryable());
    assert!(matches!(
        h.session.load_source(video_source("other.mp4", 5.0)).await,
        Err(Error::Busy(_))
    ));

    h.encoder.release.notify_one();
    export.await.unwrap().unwrap();

    assert_eq!(spans(&h), vec![(0.0, 60.0)]);
    assert!(matches!(
        h.session.add_split_point(30.0).unwrap(),
        Applied::Now(CommandOutcome::Added(_))
    ));
}

#[tokio::test]
async fn cancel_stops_at_segment_boundary() {
    let h = TestHarness::with(Config::default(), ScriptedEncoder::gated());
    h.session.load_source(video_source("v.mp4", 90.0)).await.unwrap();
    h.session.add_split_point(30.0).unwrap();
    h.session.add_split_point(60.0).unwrap();

    let export = {
        let session = h.session.clone();
        tokio::spawn(async move { session.export_all().await })
    };
    h.encoder.entered.notified().await;
    assert!(h.session.cancel_export());

    // The in-flight segment finishes; nothing after it starts.
    h.encoder.release.notify_one();
    let err = export.await.unwrap().unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert_eq!(h.encoder.calls.lock().len(), 1);
    assert!(h.sink.files().is_empty());
    assert_eq!(h.session.export_status().state, ExportState::Failed);
    assert!(!h.session.is_exporting());
}

#[tokio::test]
async fn dropped_export_future_releases_the_session() {
    let h = TestHarness::with(Config::default(), ScriptedEncoder::gated());
    h.session.load_source(video_source("v.mp4", 10.0)).await.unwrap();

    let export = {
        let session = h.session.clone();
        tokio::spawn(async move { session.export_all().await })
    };
    h.encoder.entered.notified().await;
    h.session.add_split_point(5.0).unwrap();

    export.abort();
    let _ = export.await;

    assert!(!h.session.is_exporting());
    assert!(!h.session.export_status().state.is_active());
    assert_eq!(h.session.export_status().state, ExportState::Failed);
    assert_eq!(h.session.segments().len(), 2);

    // The next export runs normally and ends idle.
    let export = {
        let session = h.session.clone();
        tokio::spawn(async move { session.export_all().await })
    };
    for _ in 0..2 {
        h.encoder.entered.notified().await;
        h.encoder.release.notify_one();
    }
    export.await.unwrap().unwrap();
    assert_eq!(h.session.export_status().state, ExportState::Idle);
}
