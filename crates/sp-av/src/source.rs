//! The loaded media file an editing session works on.
//!
//! A [`MediaSource`] is immutable once built and is shared read-only (behind
//! an `Arc`) by every extraction and encode of a session. Replacing the file
//! means building a new source.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sp_core::{Error, MediaKind, SourceId, VideoContainer};

use crate::pcm::AudioBuffer;

/// Container-level facts about a video source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub duration: f64,
    pub container: VideoContainer,
    /// Frames per second, if known.
    pub frame_rate: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Kind-specific payload of a [`MediaSource`].
#[derive(Debug, Clone)]
pub enum SourceDetails {
    /// Decoded PCM ready for sample-accurate slicing.
    Audio(AudioBuffer),
    /// Only metadata; cuts are performed by the encoder on `bytes`.
    Video(VideoInfo),
}

/// One media file loaded for editing.
#[derive(Debug, Clone)]
pub struct MediaSource {
    id: SourceId,
    file_name: String,
    bytes: Bytes,
    details: SourceDetails,
}

impl MediaSource {
    /// An audio source whose PCM has already been decoded.
    pub fn audio(file_name: impl Into<String>, bytes: Bytes, pcm: AudioBuffer) -> Self {
        Self {
            id: SourceId::new(),
            file_name: file_name.into(),
            bytes,
            details: SourceDetails::Audio(pcm),
        }
    }

    /// An audio source decoded from WAV bytes.
    pub fn from_wav_bytes(file_name: impl Into<String>, bytes: Bytes) -> sp_core::Result<Self> {
        let pcm = AudioBuffer::from_wav_bytes(&bytes)?;
        Ok(Self::audio(file_name, bytes, pcm))
    }

    /// A video source described by probed metadata.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] if the duration is not a finite non-negative
    /// number.
    pub fn video(file_name: impl Into<String>, bytes: Bytes, info: VideoInfo) -> sp_core::Result<Self> {
        if !info.duration.is_finite() || info.duration < 0.0 {
            return Err(Error::Validation(format!(
                "invalid video duration {}",
                info.duration
            )));
        }
        Ok(Self {
            id: SourceId::new(),
            file_name: file_name.into(),
            bytes,
            details: SourceDetails::Video(info),
        })
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// File name without its final extension (`"talk.final.mp3"` gives
    /// `"talk.final"`). A name with no extension, or a dotfile, is returned
    /// unchanged.
    pub fn base_name(&self) -> &str {
        match self.file_name.rfind('.') {
            Some(0) | None => &self.file_name,
            Some(dot) => &self.file_name[..dot],
        }
    }

    /// Extension of the original file, lowercased, if any.
    pub fn extension(&self) -> Option<String> {
        match self.file_name.rfind('.') {
            Some(0) | None => None,
            Some(dot) => Some(self.file_name[dot + 1..].to_ascii_lowercase()),
        }
    }

    /// Original file bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn kind(&self) -> MediaKind {
        match self.details {
            SourceDetails::Audio(_) => MediaKind::Audio,
            SourceDetails::Video(_) => MediaKind::Video,
        }
    }

    pub fn details(&self) -> &SourceDetails {
        &self.details
    }

    /// Decoded samples, for audio sources.
    pub fn pcm(&self) -> Option<&AudioBuffer> {
        match &self.details {
            SourceDetails::Audio(pcm) => Some(pcm),
            SourceDetails::Video(_) => None,
        }
    }

    /// Container metadata, for video sources.
    pub fn video_info(&self) -> Option<&VideoInfo> {
        match &self.details {
            SourceDetails::Audio(_) => None,
            SourceDetails::Video(info) => Some(info),
        }
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        match &self.details {
            SourceDetails::Audio(pcm) => pcm.duration(),
            SourceDetails::Video(info) => info.duration,
        }
    }
}
