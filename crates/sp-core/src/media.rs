//! Media-domain enums: media class, output formats, containers, cut policy.
//!
//! All enums serialize in lowercase (via `serde(rename_all = ...)`) and
//! implement `Display` manually for consistent string representation.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// MediaKind
// ---------------------------------------------------------------------------

/// Media class of a loaded source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    /// Classify a MIME type such as `audio/mpeg` or `video/mp4`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let class = mime.split('/').next()?.trim().to_ascii_lowercase();
        match class.as_str() {
            "audio" => Some(Self::Audio),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "video"),
        }
    }
}

// ---------------------------------------------------------------------------
// AudioFormat
// ---------------------------------------------------------------------------

/// Target format for exported audio segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Wav,
    Aac,
    Opus,
    Flac,
}

impl AudioFormat {
    /// File extension used for output names.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Aac => "m4a",
            Self::Opus => "opus",
            Self::Flac => "flac",
        }
    }

    /// MIME type handed to the output sink.
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Wav => "audio/wav",
            Self::Aac => "audio/mp4",
            Self::Opus => "audio/ogg",
            Self::Flac => "audio/flac",
        }
    }

    /// Whether the format takes a bitrate (lossy codecs only).
    pub fn is_lossy(&self) -> bool {
        matches!(self, Self::Mp3 | Self::Aac | Self::Opus)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mp3 => write!(f, "mp3"),
            Self::Wav => write!(f, "wav"),
            Self::Aac => write!(f, "aac"),
            Self::Opus => write!(f, "opus"),
            Self::Flac => write!(f, "flac"),
        }
    }
}

// ---------------------------------------------------------------------------
// VideoContainer
// ---------------------------------------------------------------------------

/// Container for exported video segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoContainer {
    Mp4,
    Mkv,
    Webm,
    Mov,
}

impl VideoContainer {
    /// Guess the container from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp4" | "m4v" => Some(Self::Mp4),
            "mkv" => Some(Self::Mkv),
            "webm" => Some(Self::Webm),
            "mov" => Some(Self::Mov),
            _ => None,
        }
    }

    /// Guess the container from an ffprobe `format_name` such as
    /// `"mov,mp4,m4a,3gp,3g2,mj2"` or `"matroska,webm"`.
    pub fn from_format_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.contains("mp4") {
            Some(Self::Mp4)
        } else if lower.contains("matroska") {
            Some(Self::Mkv)
        } else if lower.contains("webm") {
            Some(Self::Webm)
        } else if lower.contains("mov") {
            Some(Self::Mov)
        } else {
            None
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mkv => "mkv",
            Self::Webm => "webm",
            Self::Mov => "mov",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Mp4 => "video/mp4",
            Self::Mkv => "video/x-matroska",
            Self::Webm => "video/webm",
            Self::Mov => "video/quicktime",
        }
    }
}

impl fmt::Display for VideoContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

// ---------------------------------------------------------------------------
// CutPrecision
// ---------------------------------------------------------------------------

/// How video segments are cut.
///
/// `StreamCopy` re-muxes existing packets and is fast, but a cut that does
/// not land on a keyframe starts at the preceding keyframe. `Reencode`
/// decodes and re-encodes so cuts are frame-accurate at the cost of time
/// and quality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutPrecision {
    #[default]
    StreamCopy,
    Reencode,
}

impl fmt::Display for CutPrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StreamCopy => write!(f, "stream_copy"),
            Self::Reencode => write!(f, "reencode"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_kind_from_mime() {
        assert_eq!(MediaKind::from_mime("audio/mpeg"), Some(MediaKind::Audio));
        assert_eq!(MediaKind::from_mime("Video/MP4"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_mime("image/png"), None);
        assert_eq!(MediaKind::from_mime(""), None);
    }

    #[test]
    fn audio_format_metadata() {
        assert_eq!(AudioFormat::Mp3.extension(), "mp3");
        assert_eq!(AudioFormat::Mp3.mime(), "audio/mpeg");
        assert_eq!(AudioFormat::Aac.extension(), "m4a");
        assert!(AudioFormat::Opus.is_lossy());
        assert!(!AudioFormat::Wav.is_lossy());
        assert!(!AudioFormat::Flac.is_lossy());
    }

    #[test]
    fn audio_format_serde() {
        let json = serde_json::to_string(&AudioFormat::Flac).unwrap();
        assert_eq!(json, "\"flac\"");
        let back: AudioFormat = serde_json::from_str("\"mp3\"").unwrap();
        assert_eq!(back, AudioFormat::Mp3);
    }

    #[test]
    fn container_from_extension() {
        assert_eq!(VideoContainer::from_extension("MP4"), Some(VideoContainer::Mp4));
        assert_eq!(VideoContainer::from_extension("m4v"), Some(VideoContainer::Mp4));
        assert_eq!(VideoContainer::from_extension("mkv"), Some(VideoContainer::Mkv));
        assert_eq!(VideoContainer::from_extension("avi"), None);
    }

    #[test]
    fn container_from_format_name() {
        assert_eq!(
            VideoContainer::from_format_name("mov,mp4,m4a,3gp,3g2,mj2"),
            Some(VideoContainer::Mp4)
        );
        assert_eq!(
            VideoContainer::from_format_name("matroska,webm"),
            Some(VideoContainer::Mkv)
        );
        assert_eq!(VideoContainer::from_format_name("webm"), Some(VideoContainer::Webm));
        assert_eq!(VideoContainer::from_format_name("avi"), None);
    }

    #[test]
    fn cut_precision_serde() {
        assert_eq!(CutPrecision::default(), CutPrecision::StreamCopy);
        let json = serde_json::to_string(&CutPrecision::Reencode).unwrap();
        assert_eq!(json, "\"reencode\"");
        let back: CutPrecision = serde_json::from_str("\"stream_copy\"").unwrap();
        assert_eq!(back, CutPrecision::StreamCopy);
        assert_eq!(CutPrecision::StreamCopy.to_string(), "stream_copy");
    }
}
