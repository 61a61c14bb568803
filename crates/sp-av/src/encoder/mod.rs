//! The encoder adapter: a stable contract over whatever actually encodes.
//!
//! The export pipeline only sees the [`Encoder`] trait. Two implementations
//! ship with the crate:
//!
//! - [`FfmpegEncoder`] -- shells out to ffmpeg for compressed audio and for
//!   video cuts. Initialization locates the binary through an ordered list of
//!   [`ToolSource`](crate::tools::ToolSource)s.
//! - [`WavEncoder`] -- writes PCM WAV in-process; audio only, always ready.
//!
//! An encoder instance is a single stateful resource. Callers must not issue
//! concurrent [`Encoder::encode`] calls against the same instance; the
//! pipeline runs segments strictly one after another.

mod args;
mod fallback;
mod ffmpeg;
mod wav;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use sp_core::{AudioFormat, CutPrecision, VideoContainer};

use crate::extract::{CutSpec, Extracted};
use crate::pcm::AudioBuffer;
use crate::source::MediaSource;

pub use args::{audio_args, cut_args};
pub use fallback::first_success;
pub use ffmpeg::FfmpegEncoder;
pub use wav::WavEncoder;

/// What to encode.
#[derive(Debug, Clone)]
pub enum EncodeInput {
    /// Raw samples for one audio segment.
    Pcm(AudioBuffer),
    /// A cut to apply to an already-loaded video source.
    Cut {
        source: Arc<MediaSource>,
        cut: CutSpec,
    },
}

impl EncodeInput {
    /// Wrap an extraction result. Video cuts need the source they refer to.
    pub fn from_extracted(extracted: Extracted, source: &Arc<MediaSource>) -> Self {
        match extracted {
            Extracted::Audio(pcm) => Self::Pcm(pcm),
            Extracted::Cut(cut) => Self::Cut {
                source: Arc::clone(source),
                cut,
            },
        }
    }
}

/// Output format parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeTarget {
    Audio {
        format: AudioFormat,
        bitrate_kbps: u32,
    },
    Video {
        container: VideoContainer,
        precision: CutPrecision,
    },
}

impl EncodeTarget {
    /// Output file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Audio { format, .. } => format.extension(),
            Self::Video { container, .. } => container.extension(),
        }
    }

    /// Output MIME type.
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Audio { format, .. } => format.mime(),
            Self::Video { container, .. } => container.mime(),
        }
    }
}

/// One encode call.
#[derive(Debug, Clone)]
pub struct EncodeRequest {
    pub input: EncodeInput,
    pub target: EncodeTarget,
}

/// Black-box encode capability.
///
/// Errors are reported through [`sp_core::Error`] so the caller can tell
/// them apart:
///
/// - [`Error::NotReady`](sp_core::Error::NotReady) /
///   [`Error::Initialization`](sp_core::Error::Initialization) -- the
///   encoder could not be brought up;
/// - [`Error::EncodeRejected`](sp_core::Error::EncodeRejected) -- empty or
///   malformed input;
/// - [`Error::ResourceExhausted`](sp_core::Error::ResourceExhausted) -- the
///   engine itself failed.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Short name used in logs (e.g. "ffmpeg").
    fn name(&self) -> &'static str;

    /// Initialize lazily. Idempotent; concurrent callers share one attempt,
    /// and a failed attempt leaves the encoder not ready so the next call
    /// starts over.
    async fn ensure_ready(&self) -> sp_core::Result<()>;

    /// Whether [`ensure_ready`](Encoder::ensure_ready) has succeeded.
    fn is_ready(&self) -> bool;

    /// Encode one segment. Transient files are removed before returning,
    /// whatever the outcome.
    async fn encode(&self, request: EncodeRequest) -> sp_core::Result<Bytes>;

    /// Drop any state cached across calls (e.g. a staged copy of a video
    /// file). Called when an export settles and when the source is replaced.
    async fn release(&self) {}
}

/// Reject inputs the encoder must never see.
pub(crate) fn check_input(request: &EncodeRequest) -> sp_core::Result<()> {
    match (&request.input, &request.target) {
        (EncodeInput::Pcm(pcm), EncodeTarget::Audio { .. }) => {
            if pcm.is_empty() {
                return Err(sp_core::Error::EncodeRejected("no samples to encode".into()));
            }
        }
        (EncodeInput::Cut { source, cut }, EncodeTarget::Video { .. }) => {
            if cut.duration() <= 0.0 {
                return Err(sp_core::Error::EncodeRejected(format!(
                    "empty cut [{}, {})",
                    cut.start, cut.end
                )));
            }
            if source.bytes().is_empty() {
                return Err(sp_core::Error::EncodeRejected("video source has no data".into()));
            }
        }
        (EncodeInput::Pcm(_), EncodeTarget::Video { .. }) => {
            return Err(sp_core::Error::EncodeRejected(
                "PCM input cannot target a video container".into(),
            ));
        }
        (EncodeInput::Cut { .. }, EncodeTarget::Audio { .. }) => {
            return Err(sp_core::Error::EncodeRejected(
                "video cut cannot target an audio format".into(),
            ));
        }
    }
    Ok(())
}
