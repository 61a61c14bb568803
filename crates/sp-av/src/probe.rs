//! ffprobe-based media inspection.
//!
//! Shells out to `ffprobe -v quiet -print_format json -show_format -show_streams`
//! and maps the JSON output into a [`ProbeInfo`].

use std::path::{Path, PathBuf};

use serde::Deserialize;
use sp_core::{Error, VideoContainer};

use crate::command::ToolCommand;
use crate::source::VideoInfo;
use crate::tools::ToolRegistry;
use crate::workspace::Workspace;

/// What ffprobe reported about a file.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeInfo {
    /// Container duration in seconds, when the container records one.
    pub duration: Option<f64>,
    /// ffprobe's comma-separated demuxer names (e.g. `"matroska,webm"`).
    pub format_name: String,
    pub video: Option<VideoStream>,
    pub audio: Option<AudioStream>,
}

/// First video stream.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoStream {
    pub codec: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<f64>,
}

/// First audio stream.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioStream {
    pub codec: String,
    pub sample_rate: Option<u32>,
    pub channels: Option<u32>,
}

impl ProbeInfo {
    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }

    /// Build [`VideoInfo`] for a file named `file_name`.
    ///
    /// The container comes from the file extension when it is recognized,
    /// otherwise from the format name (ffprobe reports mp4 and mov alike,
    /// and mkv and webm alike).
    pub fn video_info(&self, file_name: &str) -> sp_core::Result<VideoInfo> {
        let stream = self
            .video
            .as_ref()
            .ok_or_else(|| Error::Probe(format!("{file_name} has no video stream")))?;
        let duration = self
            .duration
            .ok_or_else(|| Error::Probe(format!("{file_name} reports no duration")))?;

        let container = Path::new(file_name)
            .extension()
            .and_then(|e| VideoContainer::from_extension(&e.to_string_lossy()))
            .or_else(|| VideoContainer::from_format_name(&self.format_name))
            .ok_or_else(|| Error::Probe(format!("unsupported container '{}'", self.format_name)))?;

        Ok(VideoInfo {
            duration,
            container,
            frame_rate: stream.frame_rate,
            width: stream.width,
            height: stream.height,
        })
    }
}

/// A prober backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe_path: PathBuf,
}

impl FfprobeProber {
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self { ffprobe_path }
    }

    /// Use the ffprobe found by the registry.
    pub fn from_registry(tools: &ToolRegistry) -> sp_core::Result<Self> {
        Ok(Self::new(tools.require("ffprobe")?.to_path_buf()))
    }

    /// Probe a file on disk.
    pub async fn probe_file(&self, path: &Path) -> sp_core::Result<ProbeInfo> {
        let mut cmd = ToolCommand::new(self.ffprobe_path.clone());
        cmd.args([
            "-v", "quiet",
            "-print_format", "json",
            "-show_format",
            "-show_streams",
        ]);
        cmd.arg(path.to_string_lossy().as_ref());

        let output = cmd.execute().await?;
        parse_probe_json(&output.stdout)
    }

    /// Probe in-memory file contents by staging them in a scratch directory.
    pub async fn probe_bytes(&self, data: &[u8], file_name: &str) -> sp_core::Result<ProbeInfo> {
        let workspace = Workspace::new("probe")?;
        let result = match workspace.write(&staged_name(file_name), data) {
            Ok(path) => self.probe_file(&path).await,
            Err(e) => Err(e),
        };
        workspace.close();
        result
    }
}

/// Keep the extension so ffprobe can use it as a hint.
fn staged_name(file_name: &str) -> String {
    match Path::new(file_name).extension() {
        Some(ext) => format!("input.{}", ext.to_string_lossy()),
        None => "input".into(),
    }
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    channels: Option<u32>,
    sample_rate: Option<String>,
    #[serde(default)]
    disposition: FfprobeDisposition,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeDisposition {
    #[serde(default)]
    attached_pic: u8,
}

impl FfprobeStream {
    /// Embedded cover art shows up as a one-frame video stream.
    fn is_attached_picture(&self) -> bool {
        self.disposition.attached_pic != 0
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn parse_probe_json(json: &str) -> sp_core::Result<ProbeInfo> {
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| Error::Probe(format!("ffprobe JSON parse error: {e}")))?;

    let duration = output
        .format
        .duration
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0);

    let mut video = None;
    let mut audio = None;
    for stream in output.streams {
        match stream.codec_type.as_deref() {
            Some("video") if video.is_none() && !stream.is_attached_picture() => {
                video = Some(VideoStream {
                    codec: stream.codec_name.unwrap_or_default(),
                    width: stream.width,
                    height: stream.height,
                    frame_rate: stream.r_frame_rate.as_deref().and_then(parse_frame_rate),
                });
            }
            Some("audio") if audio.is_none() => {
                audio = Some(AudioStream {
                    codec: stream.codec_name.unwrap_or_default(),
                    sample_rate: stream.sample_rate.and_then(|s| s.parse().ok()),
                    channels: stream.channels,
                });
            }
            _ => {}
        }
    }

    Ok(ProbeInfo {
        duration,
        format_name: output.format.format_name.unwrap_or_default(),
        video,
        audio,
    })
}

fn parse_frame_rate(rate_str: &str) -> Option<f64> {
    if let Some((num, den)) = rate_str.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        return (den != 0.0).then(|| num / den);
    }
    rate_str.parse().ok()
}
