//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], an [`EditSession`] wired to a
//! [`ScriptedEncoder`] and a [`CollectingSink`], plus helpers to build
//! sources and fake ffmpeg binaries.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Notify;

use splitforge::sp_av::{AudioBuffer, EncodeInput, EncodeRequest, Encoder, MediaSource, VideoInfo};
use splitforge::sp_core::config::Config;
use splitforge::sp_core::{Error, VideoContainer};
use splitforge::sp_pipeline::CollectingSink;
use splitforge::EditSession;

/// Encoder whose behaviour is set per test.
#[derive(Default)]
pub struct ScriptedEncoder {
    /// `ensure_ready` fails this many times before succeeding.
    pub init_failures: AtomicUsize,
    pub init_calls: AtomicUsize,
    /// 1-based encode call that fails with a resource error.
    pub fail_on_call: Option<usize>,
    /// When set, each `encode` waits for `release` after signalling `entered`.
    pub gated: bool,
    pub entered: Notify,
    pub release: Notify,
    /// `(start, end)` of every encode, in call order.
    pub calls: Mutex<Vec<(f64, f64)>>,
}

impl ScriptedEncoder {
    pub fn gated() -> Self {
        Self {
            gated: true,
            ..Default::default()
        }
    }

    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Default::default()
        }
    }

    pub fn failing_init(times: usize) -> Self {
        Self {
            init_failures: AtomicUsize::new(times),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Encoder for ScriptedEncoder {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn ensure_ready(&self) -> splitforge::sp_core::Result<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.init_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.init_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::initialization(vec![
                "primary: unavailable".into(),
                "fallback: unavailable".into(),
            ]));
        }
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.init_failures.load(Ordering::SeqCst) == 0
    }

    async fn encode(&self, request: EncodeRequest) -> splitforge::sp_core::Result<Bytes> {
        let span = match &request.input {
            EncodeInput::Cut { cut, .. } => (cut.start, cut.end),
            EncodeInput::Pcm(pcm) => (0.0, pcm.duration()),
        };
        let call = {
            let mut calls = self.calls.lock();
            calls.push(span);
            calls.len()
        };

        if self.gated {
            self.entered.notify_one();
            self.release.notified().await;
        }
        if self.fail_on_call == Some(call) {
            return Err(Error::resource_exhausted("scripted", "encoder crashed"));
        }
        Ok(Bytes::from(format!("{}-{}", span.0, span.1)))
    }
}

/// An [`EditSession`] plus handles on its collaborators.
pub struct TestHarness {
    pub session: Arc<EditSession>,
    pub encoder: Arc<ScriptedEncoder>,
    pub sink: Arc<CollectingSink>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with(Config::default(), ScriptedEncoder::default())
    }

    pub fn with(config: Config, encoder: ScriptedEncoder) -> Self {
        let encoder = Arc::new(encoder);
        let sink = Arc::new(CollectingSink::new());
        let session = Arc::new(EditSession::new(config, encoder.clone(), sink.clone()));
        Self {
            session,
            encoder,
            sink,
        }
    }

    pub fn delivered_names(&self) -> Vec<String> {
        self.sink.files().into_iter().map(|f| f.file_name).collect()
    }
}

/// A video source with the given duration; the bytes are never decoded.
pub fn video_source(file_name: &str, duration: f64) -> MediaSource {
    MediaSource::video(
        file_name,
        Bytes::from_static(b"\x00\x00\x00\x18ftypmp42"),
        VideoInfo {
            duration,
            container: VideoContainer::Mp4,
            frame_rate: Some(30.0),
            width: Some(1920),
            height: Some(1080),
        },
    )
    .expect("valid video info")
}

/// A mono audio source of silence.
pub fn audio_source(file_name: &str, seconds: usize, sample_rate: u32) -> MediaSource {
    let pcm = AudioBuffer::silent(sample_rate, 1, seconds * sample_rate as usize).unwrap();
    MediaSource::audio(file_name, Bytes::new(), pcm)
}

/// A 16-bit stereo WAV file with a rising ramp, written with `hound`.
pub fn ramp_wav(sample_rate: u32, frames: usize) -> Bytes {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..frames {
            let v = (i % 20_000) as i16;
            writer.write_sample(v).unwrap();
            writer.write_sample(-v).unwrap();
        }
        writer.finalize().unwrap();
    }
    Bytes::from(cursor.into_inner())
}

/// How a fake `ffmpeg` behaves.
#[cfg(unix)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeFfmpeg {
    /// Answers `-version` and writes `payload` to its last argument.
    Working,
    /// Answers `-version` but exits non-zero for every encode.
    FailingEncodes,
    /// Exits non-zero for everything.
    Broken,
}

/// Write an executable shell script named `ffmpeg` into `dir`.
///
/// Every invocation appends its arguments as one line to `dir/calls.log`.
#[cfg(unix)]
pub fn install_fake_ffmpeg(dir: &Path, behaviour: FakeFfmpeg) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let version = "if [ \"$1\" = \"-version\" ]; then echo \"ffmpeg version fake\"; exit 0; fi\n";
    let body = match behaviour {
        FakeFfmpeg::Working => format!(
            "{version}for last; do :; done\nprintf 'payload' > \"$last\"\n"
        ),
        FakeFfmpeg::FailingEncodes => format!("{version}echo 'Conversion failed!' >&2\nexit 1\n"),
        FakeFfmpeg::Broken => "exit 1\n".to_string(),
    };
    let exe = dir.join("ffmpeg");
    let log = dir.join("calls.log");
    std::fs::write(
        &exe,
        format!("#!/bin/sh\necho \"$@\" >> '{}'\n{body}", log.display()),
    )
    .unwrap();
    std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();
    exe
}

/// Input paths (`-i <path>`) of every logged fake `ffmpeg` call in `dir`.
#[cfg(unix)]
pub fn logged_inputs(dir: &Path) -> Vec<PathBuf> {
    let log = std::fs::read_to_string(dir.join("calls.log")).unwrap_or_default();
    log.lines()
        .filter_map(|line| {
            let mut args = line.split_whitespace();
            args.find(|a| *a == "-i")?;
            args.next().map(PathBuf::from)
        })
        .collect()
}
