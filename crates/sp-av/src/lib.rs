//! # sp-av
//!
//! Media sources, segment extraction, and the encoder adapter for splitforge.
//!
//! This crate provides:
//!
//! - **Sources** ([`MediaSource`], [`MediaLoader`]) -- decoded PCM for audio,
//!   probed metadata plus original bytes for video.
//! - **Extraction** ([`extract`]) -- cut one `[start, end)` span out of a
//!   source without touching it.
//! - **Encoding** ([`Encoder`], [`FfmpegEncoder`], [`WavEncoder`]) -- lazy
//!   initialization with fallback tool sources and guaranteed cleanup of
//!   scratch files.
//! - **Tool discovery** ([`ToolRegistry`]) and **command execution**
//!   ([`ToolCommand`]) for ffmpeg and ffprobe.
//! - **Workspace management** ([`Workspace`]) -- temporary directory lifecycle.

pub mod command;
pub mod encoder;
pub mod extract;
pub mod loader;
pub mod pcm;
pub mod probe;
pub mod source;
pub mod tools;
pub mod workspace;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use encoder::{
    EncodeInput, EncodeRequest, EncodeTarget, Encoder, FfmpegEncoder, WavEncoder,
};
pub use extract::{extract, extract_span, CutSpec, Extracted};
pub use loader::MediaLoader;
pub use pcm::{AudioBuffer, WavEncoding};
pub use probe::{FfprobeProber, ProbeInfo};
pub use source::{MediaSource, SourceDetails, VideoInfo};
pub use tools::{ToolInfo, ToolRegistry, ToolSource};
pub use workspace::Workspace;
