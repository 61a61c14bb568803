//! Engine configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! tool, export, session and logging settings. Every section defaults
//! sensibly so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::media::{AudioFormat, CutPrecision, VideoContainer};
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub export: ExportConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None`, the file does not exist, or it cannot be parsed.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(ref p) = self.tools.ffmpeg_path {
            if !p.exists() {
                warnings.push(format!(
                    "tools.ffmpeg_path {} does not exist; falling back to PATH",
                    p.display()
                ));
            }
        }

        if self.tools.timeout_secs == Some(0) {
            warnings.push("tools.timeout_secs is 0; every encode would time out".into());
        }

        if self.export.audio_format.is_lossy() && self.export.audio_bitrate_kbps == 0 {
            warnings.push(format!(
                "export.audio_bitrate_kbps is 0 for lossy format {}",
                self.export.audio_format
            ));
        }

        if self.export.audio_bitrate_kbps > 512 {
            warnings.push(format!(
                "export.audio_bitrate_kbps {} is unusually high",
                self.export.audio_bitrate_kbps
            ));
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Locations of external CLI tools.
///
/// The encoder tries `ffmpeg_path` first, then `PATH`, then each entry of
/// `search_dirs` in order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    pub search_dirs: Vec<PathBuf>,
    /// Per-invocation timeout. `None` means no timeout.
    pub timeout_secs: Option<u64>,
}

/// What to do with a segment that spans no samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptySegmentPolicy {
    /// Log and skip it; the remaining segments keep their ordinals.
    #[default]
    Skip,
    /// Abort the export with [`Error::EmptySegment`].
    Fail,
}

/// Video output container selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerChoice {
    /// Reuse the container of the source file.
    #[default]
    Keep,
    Mp4,
    Mkv,
    Webm,
    Mov,
}

impl ContainerChoice {
    /// Resolve against the source container.
    pub fn resolve(&self, source: VideoContainer) -> VideoContainer {
        match self {
            Self::Keep => source,
            Self::Mp4 => VideoContainer::Mp4,
            Self::Mkv => VideoContainer::Mkv,
            Self::Webm => VideoContainer::Webm,
            Self::Mov => VideoContainer::Mov,
        }
    }
}

/// Export defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub audio_format: AudioFormat,
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate_kbps: u32,
    pub video_container: ContainerChoice,
    pub cut_precision: CutPrecision,
    pub empty_segments: EmptySegmentPolicy,
}

fn default_audio_bitrate() -> u32 {
    192
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            audio_format: AudioFormat::Mp3,
            audio_bitrate_kbps: default_audio_bitrate(),
            video_container: ContainerChoice::Keep,
            cut_precision: CutPrecision::StreamCopy,
            empty_segments: EmptySegmentPolicy::Skip,
        }
    }
}

/// How timeline edits requested during an export are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationPolicy {
    /// Queue the edit and apply it once the export settles.
    #[default]
    Defer,
    /// Refuse the edit with [`Error::Busy`].
    Reject,
}

/// Editing session settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub mutation_policy: MutationPolicy,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set.
    #[serde(default = "default_filter")]
    pub filter: String,
    pub ansi: bool,
}

fn default_filter() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            ansi: true,
        }
    }
}
