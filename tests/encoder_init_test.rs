//! Lazy encoder initialization as seen from an export.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{video_source, ScriptedEncoder, TestHarness};
use splitforge::sp_core::config::Config;
use splitforge::sp_core::{Error, ErrorKind, ExportState};
use splitforge::sp_pipeline::CollectingSink;
use splitforge::EditSession;

#[tokio::test]
async fn failed_initialization_fails_the_job_and_is_retried() {
    let h = TestHarness::with(Config::default(), ScriptedEncoder::failing_init(1));
    h.session.load_source(video_source("v.mp4", 30.0)).await.unwrap();

    let err = h.session.export_all().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Initialization);
    assert!(err.is_retryable());
    assert!(h.encoder.calls.lock().is_empty());
    assert_eq!(h.session.export_status().state, ExportState::Failed);

    let report = h.session.export_all().await.unwrap();
    assert_eq!(report.outputs.len(), 1);
    assert_eq!(h.encoder.init_calls.load(Ordering::SeqCst), 2);
}

#[cfg(unix)]
mod ffmpeg {
    use super::*;
    use common::{install_fake_ffmpeg, logged_inputs, FakeFfmpeg};
    use splitforge::sp_av::{Encoder, FfmpegEncoder, ToolSource};
    use std::path::PathBuf;

    fn encoder_for(dir: &std::path::Path) -> FfmpegEncoder {
        FfmpegEncoder::new(vec![
            ToolSource::Configured(PathBuf::from("/nonexistent/ffmpeg")),
            ToolSource::Directory(dir.to_path_buf()),
        ])
    }

    #[tokio::test]
    async fn every_source_failing_lists_each_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = encoder_for(dir.path());

        let err = encoder.ensure_ready().await.unwrap_err();
        let Error::Initialization { attempts } = &err else {
            panic!("expected initialization error, got {err:?}");
        };
        assert_eq!(attempts.len(), 2);
        assert!(attempts[0].contains("/nonexistent/ffmpeg"));
        assert!(!encoder.is_ready());

        // A later attempt walks the sources again and finds the new binary.
        install_fake_ffmpeg(dir.path(), FakeFfmpeg::Working);
        encoder.ensure_ready().await.unwrap();
        assert!(encoder.is_ready());
        let binary = encoder.binary().unwrap();
        assert!(binary.ends_with("ffmpeg"));
        assert!(!binary.starts_with("/nonexistent"));
    }

    #[tokio::test]
    async fn export_through_fallback_binary() {
        let dir = tempfile::tempdir().unwrap();
        install_fake_ffmpeg(dir.path(), FakeFfmpeg::Working);
        let sink = Arc::new(CollectingSink::new());
        let session = EditSession::new(
            Config::default(),
            Arc::new(encoder_for(dir.path())),
            sink.clone(),
        );
        session.load_source(video_source("demo.mp4", 20.0)).await.unwrap();
        session.add_split_point(8.0).unwrap();

        let report = session.export_all().await.unwrap();

        assert_eq!(report.outputs.len(), 2);
        let files = sink.files();
        assert_eq!(files[0].file_name, "demo_segment_1.mp4");
        assert_eq!(files[1].file_name, "demo_segment_2.mp4");
        assert_eq!(files[0].mime, "video/mp4");
        assert_eq!(&files[0].bytes[..], b"payload");
    }

    #[tokio::test]
    async fn broken_binary_surfaces_as_job_failure() {
        let dir = tempfile::tempdir().unwrap();
        install_fake_ffmpeg(dir.path(), FakeFfmpeg::Broken);
        let sink = Arc::new(CollectingSink::new());
        let session = EditSession::new(
            Config::default(),
            Arc::new(encoder_for(dir.path())),
            sink.clone(),
        );
        session.load_source(video_source("demo.mp4", 20.0)).await.unwrap();

        let err = session.export_all().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Initialization);
        assert!(sink.files().is_empty());
    }

    fn assert_staged_copies_removed(dir: &std::path::Path) {
        let inputs = logged_inputs(dir);
        assert!(!inputs.is_empty(), "no cut was run");
        for input in inputs {
            assert!(!input.exists(), "{} left behind", input.display());
            if let Some(parent) = input.parent() {
                assert!(!parent.exists(), "{} left behind", parent.display());
            }
        }
    }

    #[tokio::test]
    async fn staged_video_removed_after_export() {
        let dir = tempfile::tempdir().unwrap();
        install_fake_ffmpeg(dir.path(), FakeFfmpeg::Working);
        let session = EditSession::new(
            Config::default(),
            Arc::new(encoder_for(dir.path())),
            Arc::new(CollectingSink::new()),
        );
        session.load_source(video_source("demo.mp4", 20.0)).await.unwrap();
        session.add_split_point(8.0).unwrap();

        session.export_all().await.unwrap();

        // Both cuts read the same staged copy.
        let inputs = logged_inputs(dir.path());
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0], inputs[1]);
        assert_staged_copies_removed(dir.path());
    }

    #[tokio::test]
    async fn staged_video_removed_after_failed_export() {
        let dir = tempfile::tempdir().unwrap();
        install_fake_ffmpeg(dir.path(), FakeFfmpeg::FailingEncodes);
        let sink = Arc::new(CollectingSink::new());
        let session = EditSession::new(
            Config::default(),
            Arc::new(encoder_for(dir.path())),
            sink.clone(),
        );
        session.load_source(video_source("demo.mp4", 20.0)).await.unwrap();

        let err = session.export_all().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encode);
        assert!(sink.files().is_empty());
        assert_staged_copies_removed(dir.path());
    }
}
