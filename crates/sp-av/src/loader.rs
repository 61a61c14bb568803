//! Turn uploaded file bytes into a [`MediaSource`].
//!
//! WAV audio is decoded in-process. Anything else is probed with ffprobe:
//! files with a video stream become video sources (metadata only), the rest
//! are decoded to float PCM by ffmpeg.

use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use sp_core::{Error, MediaKind};

use crate::command::ToolCommand;
use crate::pcm::AudioBuffer;
use crate::probe::FfprobeProber;
use crate::source::MediaSource;
use crate::tools::ToolRegistry;
use crate::workspace::Workspace;

/// Loads media using whatever tools the registry found.
#[derive(Debug, Clone)]
pub struct MediaLoader {
    ffmpeg: Option<PathBuf>,
    ffprobe: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl MediaLoader {
    pub fn new(tools: &ToolRegistry) -> Self {
        Self {
            ffmpeg: tools.require("ffmpeg").ok().map(|p| p.to_path_buf()),
            ffprobe: tools.require("ffprobe").ok().map(|p| p.to_path_buf()),
            timeout: None,
        }
    }

    /// A loader that only understands WAV.
    pub fn wav_only() -> Self {
        Self {
            ffmpeg: None,
            ffprobe: None,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load `bytes` as a source named `file_name`.
    ///
    /// `hint` (typically derived from the upload's MIME type) is trusted for
    /// audio: a file declared as audio is never treated as video.
    pub async fn load(
        &self,
        file_name: &str,
        bytes: Bytes,
        hint: Option<MediaKind>,
    ) -> sp_core::Result<MediaSource> {
        if bytes.is_empty() {
            return Err(Error::Validation(format!("{file_name} is empty")));
        }
        if hint != Some(MediaKind::Video) && looks_like_wav(&bytes) {
            tracing::debug!("decoding {file_name} as WAV");
            return MediaSource::from_wav_bytes(file_name, bytes);
        }

        let ffprobe = self
            .ffprobe
            .clone()
            .ok_or_else(|| Error::tool("ffprobe", "ffprobe is required to load non-WAV media"))?;
        let info = FfprobeProber::new(ffprobe).probe_bytes(&bytes, file_name).await?;

        if info.has_video() && hint != Some(MediaKind::Audio) {
            let video = info.video_info(file_name)?;
            tracing::info!(
                "loaded video {file_name}: {:.3}s, {}",
                video.duration,
                video.container
            );
            return MediaSource::video(file_name, bytes, video);
        }
        if info.audio.is_none() {
            return Err(Error::Probe(format!("{file_name} has no audio or video stream")));
        }

        let pcm = self.decode_audio(file_name, &bytes).await?;
        tracing::info!(
            "loaded audio {file_name}: {:.3}s, {} ch @ {} Hz",
            pcm.duration(),
            pcm.channel_count(),
            pcm.sample_rate()
        );
        Ok(MediaSource::audio(file_name, bytes, pcm))
    }

    async fn decode_audio(&self, file_name: &str, data: &[u8]) -> sp_core::Result<AudioBuffer> {
        let ffmpeg = self
            .ffmpeg
            .clone()
            .ok_or_else(|| Error::tool("ffmpeg", "ffmpeg is required to decode compressed audio"))?;

        let workspace = Workspace::new("decode")?;
        let result = async {
            let ext = std::path::Path::new(file_name)
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_else(|| "bin".into());
            let input = workspace.write(&format!("input.{ext}"), data)?;
            let output = workspace.temp_file("decoded.wav");

            let mut cmd = ToolCommand::new(ffmpeg);
            cmd.args(["-hide_banner", "-nostdin", "-y", "-i"]);
            cmd.arg(input.to_string_lossy().as_ref());
            cmd.args(["-vn", "-c:a", "pcm_f32le", "-f", "wav"]);
            cmd.arg(output.to_string_lossy().as_ref());
            cmd.timeout(self.timeout);
            cmd.execute().await?;

            AudioBuffer::from_wav_bytes(&workspace.read_output("decoded.wav", "ffmpeg")?)
        }
        .await;
        workspace.close();
        result
    }
}

/// RIFF/WAVE header check.
fn looks_like_wav(data: &[u8]) -> bool {
    data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WAVE"
}
