//! ffmpeg-backed encoder.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use sp_core::config::ToolsConfig;
use sp_core::{AudioFormat, CutPrecision, Error, SourceId, VideoContainer};
use tokio::sync::{Mutex, OnceCell};

use super::args::{audio_args, cut_args};
use super::fallback::first_success;
use super::{check_input, EncodeInput, EncodeRequest, EncodeTarget, Encoder};
use crate::command::ToolCommand;
use crate::extract::CutSpec;
use crate::pcm::{AudioBuffer, WavEncoding};
use crate::source::MediaSource;
use crate::tools::{sources_for, ToolSource};
use crate::workspace::Workspace;

const TOOL: &str = "ffmpeg";

/// Upper bound for the `-version` check run during initialization.
const VERSION_TIMEOUT: Duration = Duration::from_secs(30);

/// A video file copied to disk once and cut many times.
#[derive(Debug)]
struct StagedVideo {
    source: SourceId,
    workspace: Workspace,
    path: PathBuf,
}

/// Encoder that drives the ffmpeg CLI.
///
/// Nothing is spawned until [`ensure_ready`](Encoder::ensure_ready): it walks
/// the configured [`ToolSource`]s in order and keeps the first binary that
/// answers `-version`.
#[derive(Debug)]
pub struct FfmpegEncoder {
    sources: Vec<ToolSource>,
    binary: OnceCell<PathBuf>,
    timeout: Option<Duration>,
    staged: Mutex<Option<StagedVideo>>,
}

impl FfmpegEncoder {
    /// Encoder trying `sources` in order.
    pub fn new(sources: Vec<ToolSource>) -> Self {
        Self {
            sources,
            binary: OnceCell::new(),
            timeout: None,
            staged: Mutex::new(None),
        }
    }

    /// Sources and timeout taken from the tools config.
    pub fn from_config(tools: &ToolsConfig) -> Self {
        Self::new(sources_for(TOOL, tools)).with_timeout(tools.timeout_secs.map(Duration::from_secs))
    }

    /// Per-invocation timeout for encodes. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn sources(&self) -> &[ToolSource] {
        &self.sources
    }

    /// The binary selected by initialization, if any.
    pub fn binary(&self) -> Option<&PathBuf> {
        self.binary.get()
    }

    fn command(&self, binary: &PathBuf, args: Vec<String>) -> ToolCommand {
        let mut cmd = ToolCommand::new(binary.clone());
        cmd.args(args).timeout(self.timeout);
        cmd
    }

    async fn encode_audio(
        &self,
        binary: &PathBuf,
        pcm: &AudioBuffer,
        format: AudioFormat,
        bitrate_kbps: u32,
    ) -> sp_core::Result<Bytes> {
        if format == AudioFormat::Wav {
            return pcm.to_wav_bytes(WavEncoding::Int16).map(Bytes::from);
        }

        let workspace = Workspace::new("encode")?;
        let output_name = format!("segment.{}", format.extension());

        let result = async {
            let input = workspace.write("input.wav", &pcm.to_wav_bytes(WavEncoding::Float32)?)?;
            let output = workspace.temp_file(&output_name);
            self.command(binary, audio_args(&input, &output, format, bitrate_kbps))
                .execute()
                .await
                .map_err(engine_failure)?;
            workspace.read_output(&output_name, TOOL)
        }
        .await;

        workspace.close();
        result.map(Bytes::from)
    }

    async fn encode_cut(
        &self,
        binary: &PathBuf,
        source: &MediaSource,
        cut: CutSpec,
        container: VideoContainer,
        precision: CutPrecision,
    ) -> sp_core::Result<Bytes> {
        let mut staged = self.staged.lock().await;
        let input = match staged.as_ref() {
            Some(s) if s.source == source.id() => s.path.clone(),
            _ => {
                if let Some(old) = staged.take() {
                    old.workspace.close();
                }
                let fresh = stage_video(source)?;
                let path = fresh.path.clone();
                *staged = Some(fresh);
                path
            }
        };

        let workspace = Workspace::new("encode")?;
        let output_name = format!("segment.{}", container.extension());

        let result = async {
            let output = workspace.temp_file(&output_name);
            self.command(binary, cut_args(&input, &output, cut, container, precision))
                .execute()
                .await
                .map_err(engine_failure)?;
            workspace.read_output(&output_name, TOOL)
        }
        .await;

        workspace.close();
        result.map(Bytes::from)
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    fn name(&self) -> &'static str {
        TOOL
    }

    async fn ensure_ready(&self) -> sp_core::Result<()> {
        let sources = self.sources.as_slice();
        let binary = self
            .binary
            .get_or_try_init(|| async move {
                tracing::info!("initializing ffmpeg encoder ({} source(s))", sources.len());
                first_success(sources, |source| {
                    let source = source.clone();
                    async move { verify(&source).await }
                })
                .await
            })
            .await?;
        tracing::debug!("ffmpeg encoder ready: {}", binary.display());
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.binary.initialized()
    }

    async fn encode(&self, request: EncodeRequest) -> sp_core::Result<Bytes> {
        let binary = self
            .binary
            .get()
            .cloned()
            .ok_or_else(|| Error::NotReady("ffmpeg encoder has not been initialized".into()))?;
        check_input(&request)?;

        match (request.input, request.target) {
            (EncodeInput::Pcm(pcm), EncodeTarget::Audio { format, bitrate_kbps }) => {
                self.encode_audio(&binary, &pcm, format, bitrate_kbps).await
            }
            (EncodeInput::Cut { source, cut }, EncodeTarget::Video { container, precision }) => {
                self.encode_cut(&binary, &source, cut, container, precision).await
            }
            _ => Err(Error::EncodeRejected("input does not match target".into())),
        }
    }

    async fn release(&self) {
        if let Some(staged) = self.staged.lock().await.take() {
            tracing::debug!("releasing staged video for source {}", staged.source);
            staged.workspace.close();
        }
    }
}

/// Resolve `source` and check that the binary actually runs.
async fn verify(source: &ToolSource) -> sp_core::Result<PathBuf> {
    let path = source.resolve(TOOL).map_err(|reason| Error::tool(TOOL, reason))?;
    let output = ToolCommand::new(path.clone())
        .arg("-version")
        .timeout(Some(VERSION_TIMEOUT))
        .execute()
        .await?;
    if let Some(line) = output.stdout.lines().next() {
        tracing::debug!("{}: {line}", path.display());
    }
    Ok(path)
}

fn stage_video(source: &MediaSource) -> sp_core::Result<StagedVideo> {
    let workspace = Workspace::new("source")?;
    let name = format!("source.{}", source.extension().unwrap_or_else(|| "bin".into()));
    let path = workspace.write(&name, source.bytes())?;
    tracing::debug!("staged {} ({} bytes)", source.file_name(), source.bytes().len());
    Ok(StagedVideo {
        source: source.id(),
        workspace,
        path,
    })
}

/// A failing ffmpeg run is the engine giving out, not bad input.
fn engine_failure(e: Error) -> Error {
    match e {
        Error::Tool { tool, message } => Error::resource_exhausted(tool, message),
        other => other,
    }
}
