//! Export pipeline: encodes segments one after another, reports progress,
//! and delivers the whole set only once every segment has succeeded.

use std::sync::Arc;

use parking_lot::RwLock;
use sp_av::{extract, EncodeInput, EncodeRequest, EncodeTarget, Encoder, MediaSource};
use sp_core::config::{EmptySegmentPolicy, ExportConfig};
use sp_core::events::{EventBus, EventPayload};
use sp_core::{Error, ExportJobId, ExportState, Segment, Timeline};
use tokio::sync::Mutex;

use crate::context::ExportContext;
use crate::job::{ExportJob, ExportStatus};
use crate::naming::{estimate_size_mb, output_file_name};
use crate::sink::{OutputFile, OutputSink};

/// What a finished export produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub job_id: ExportJobId,
    /// Delivered files, in segment order.
    pub outputs: Vec<DeliveredOutput>,
    /// Ordinals of empty segments that were skipped.
    pub skipped: Vec<usize>,
}

/// Summary of one delivered file.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveredOutput {
    pub index: usize,
    pub file_name: String,
    pub mime: String,
    pub size: usize,
}

/// Preview of the file a segment would produce.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedOutput {
    pub segment: Segment,
    pub file_name: String,
    /// Size estimate for lossy audio; `None` when no fixed bitrate applies.
    pub estimated_mb: Option<f64>,
}

/// Runs exports against a single shared encoder.
///
/// At most one export (of any kind) runs at a time; a second request while
/// one is active fails immediately with [`Error::Busy`].
pub struct ExportPipeline {
    encoder: Arc<dyn Encoder>,
    sink: Arc<dyn OutputSink>,
    config: ExportConfig,
    events: Arc<EventBus>,
    status: RwLock<ExportStatus>,
    running: Mutex<()>,
}

impl ExportPipeline {
    pub fn new(encoder: Arc<dyn Encoder>, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            encoder,
            sink,
            config: ExportConfig::default(),
            events: Arc::new(EventBus::default()),
            status: RwLock::new(ExportStatus::default()),
            running: Mutex::new(()),
        }
    }

    /// Builder: export settings.
    pub fn with_config(mut self, config: ExportConfig) -> Self {
        self.config = config;
        self
    }

    /// Builder: publish job events on a shared bus.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn encoder(&self) -> &Arc<dyn Encoder> {
        &self.encoder
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Current state and progress.
    pub fn status(&self) -> ExportStatus {
        *self.status.read()
    }

    /// Whether an export is preparing, encoding, or delivering.
    pub fn is_active(&self) -> bool {
        self.status.read().state.is_active()
    }

    /// Encode parameters for `source` under the current settings.
    pub fn target_for(&self, source: &MediaSource) -> EncodeTarget {
        match source.video_info() {
            None => EncodeTarget::Audio {
                format: self.config.audio_format,
                bitrate_kbps: self.config.audio_bitrate_kbps,
            },
            Some(info) => EncodeTarget::Video {
                container: self.config.video_container.resolve(info.container),
                precision: self.config.cut_precision,
            },
        }
    }

    /// The files `export_all` would produce, without encoding anything.
    pub fn plan(&self, source: &MediaSource, timeline: &Timeline) -> Vec<PlannedOutput> {
        let target = self.target_for(source);
        let estimate = match target {
            EncodeTarget::Audio {
                format,
                bitrate_kbps,
            } if format.is_lossy() => Some(bitrate_kbps),
            _ => None,
        };
        timeline
            .segments()
            .into_iter()
            .map(|segment| PlannedOutput {
                file_name: output_file_name(source.base_name(), segment.index, target.extension()),
                estimated_mb: estimate.map(|kbps| estimate_size_mb(segment.duration(), kbps)),
                segment,
            })
            .collect()
    }

    /// Export every segment of `timeline`.
    ///
    /// A timeline without split points still yields one full-range segment.
    pub async fn export_all(
        &self,
        ctx: &ExportContext,
        timeline: &Timeline,
    ) -> sp_core::Result<ExportReport> {
        self.run(ctx, timeline.segments()).await
    }

    /// Export only segment `index` (1-based).
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] if the timeline has no such segment; otherwise
    /// as [`export_all`](Self::export_all).
    pub async fn export_single(
        &self,
        ctx: &ExportContext,
        timeline: &Timeline,
        index: usize,
    ) -> sp_core::Result<ExportReport> {
        let segment = timeline.segment(index).ok_or_else(|| {
            Error::Validation(format!(
                "segment {index} does not exist (timeline has {})",
                timeline.len() + 1
            ))
        })?;
        self.run(ctx, vec![segment]).await
    }

    async fn run(&self, ctx: &ExportContext, segments: Vec<Segment>) -> sp_core::Result<ExportReport> {
        let _running = self
            .running
            .try_lock()
            .map_err(|_| Error::Busy("an export is already in progress".into()))?;

        let mut job = ExportJob::new(segments);
        let mut abandoned = AbandonGuard {
            pipeline: self,
            armed: true,
        };
        let result = self.drive(&mut job, ctx).await;
        abandoned.armed = false;

        // Anything the encoder cached for this run (a staged video copy)
        // goes away with the job, whatever the outcome.
        self.encoder.release().await;
        result
    }

    async fn drive(&self, job: &mut ExportJob, ctx: &ExportContext) -> sp_core::Result<ExportReport> {
        let target = self.target_for(&ctx.source);
        tracing::info!(
            "export {} started: {} segment(s) of {} as .{}",
            job.id(),
            job.segments().len(),
            ctx.source.file_name(),
            target.extension()
        );
        self.events.broadcast(EventPayload::JobStarted {
            job_id: job.id(),
            segments: job.segments().len(),
        });

        self.transition(job, ctx, ExportState::Preparing)?;
        if let Err(e) = self.encoder.ensure_ready().await {
            return Err(self.fail(job, ctx, e));
        }

        self.transition(job, ctx, ExportState::Encoding)?;
        let (outputs, skipped) = match self.encode_segments(job, ctx, target).await {
            Ok(done) => done,
            Err(e) => return Err(self.fail(job, ctx, e)),
        };

        self.transition(job, ctx, ExportState::Delivering)?;
        let mut delivered = Vec::with_capacity(outputs.len());
        for file in outputs {
            delivered.push(DeliveredOutput {
                index: file.index,
                file_name: file.file_name.clone(),
                mime: file.mime.clone(),
                size: file.bytes.len(),
            });
            self.sink.deliver(file);
        }

        self.transition(job, ctx, ExportState::Done)?;
        tracing::info!(
            "export {} done: {} file(s) delivered, {} skipped",
            job.id(),
            delivered.len(),
            skipped.len()
        );
        self.events.broadcast(EventPayload::JobCompleted {
            job_id: job.id(),
            outputs: delivered.len(),
        });
        self.transition(job, ctx, ExportState::Idle)?;

        Ok(ExportReport {
            job_id: job.id(),
            outputs: delivered,
            skipped,
        })
    }

    /// The encode loop. Strictly sequential, in ascending segment order.
    async fn encode_segments(
        &self,
        job: &mut ExportJob,
        ctx: &ExportContext,
        target: EncodeTarget,
    ) -> sp_core::Result<(Vec<OutputFile>, Vec<usize>)> {
        let source = &ctx.source;
        let segments = job.segments().to_vec();
        let total = segments.len();
        let mut outputs = Vec::with_capacity(total);
        let mut skipped = Vec::new();

        for segment in &segments {
            if ctx.cancellation.is_cancelled() {
                tracing::info!("export {} cancelled before segment {}", job.id(), segment.index);
                return Err(Error::Cancelled);
            }

            let extracted = extract(source, segment);
            if extracted.is_empty() {
                match self.config.empty_segments {
                    EmptySegmentPolicy::Fail => {
                        return Err(Error::EmptySegment {
                            index: segment.index,
                        })
                    }
                    EmptySegmentPolicy::Skip => {
                        tracing::warn!(
                            "skipping empty segment {} [{:.3}, {:.3})",
                            segment.index,
                            segment.start,
                            segment.end
                        );
                        self.events.broadcast(EventPayload::SegmentSkipped {
                            job_id: job.id(),
                            index: segment.index,
                            reason: "segment contains no media".into(),
                        });
                        skipped.push(segment.index);
                    }
                }
            } else {
                tracing::info!(
                    "encoding segment {}/{total} [{:.3}, {:.3})",
                    segment.index,
                    segment.start,
                    segment.end
                );
                let request = EncodeRequest {
                    input: EncodeInput::from_extracted(extracted, source),
                    target,
                };
                let bytes = self
                    .encoder
                    .encode(request)
                    .await
                    .map_err(|e| e.at_segment(segment.index))?;

                self.events.broadcast(EventPayload::SegmentEncoded {
                    job_id: job.id(),
                    index: segment.index,
                    bytes: bytes.len(),
                });
                outputs.push(OutputFile {
                    index: segment.index,
                    file_name: output_file_name(source.base_name(), segment.index, target.extension()),
                    mime: target.mime().to_string(),
                    bytes,
                });
            }

            job.complete_segment();
            *self.status.write() = job.status();
            let percent = job.progress_percent();
            self.events.broadcast(EventPayload::Progress {
                job_id: job.id(),
                percent,
            });
            ctx.progress.send(percent, ExportState::Encoding);
        }

        if ctx.cancellation.is_cancelled() {
            tracing::info!("export {} cancelled before delivery", job.id());
            return Err(Error::Cancelled);
        }

        Ok((outputs, skipped))
    }

    fn transition(
        &self,
        job: &mut ExportJob,
        ctx: &ExportContext,
        next: ExportState,
    ) -> sp_core::Result<()> {
        job.advance(next)?;
        *self.status.write() = job.status();
        self.events.broadcast(EventPayload::StateChanged {
            job_id: job.id(),
            state: next,
        });
        ctx.progress.send(job.progress_percent(), next);
        Ok(())
    }

    /// Mark the job failed and hand back the error to report.
    fn fail(&self, job: &mut ExportJob, ctx: &ExportContext, err: Error) -> Error {
        tracing::error!("export {} failed: {err}", job.id());
        if let Err(e) = self.transition(job, ctx, ExportState::Failed) {
            tracing::error!("{e}");
        }
        self.events.broadcast(EventPayload::JobFailed {
            job_id: job.id(),
            kind: err.kind().to_string(),
            error: err.to_string(),
        });
        err
    }
}

impl std::fmt::Debug for ExportPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportPipeline")
            .field("encoder", &self.encoder.name())
            .field("config", &self.config)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Marks the pipeline failed when an export future is dropped before it
/// reaches a terminal state.
struct AbandonGuard<'a> {
    pipeline: &'a ExportPipeline,
    armed: bool,
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let job_id = {
            let mut status = self.pipeline.status.write();
            if !status.state.is_active() {
                return;
            }
            status.state = ExportState::Failed;
            status.job_id
        };
        let Some(job_id) = job_id else { return };
        tracing::warn!("export {job_id} abandoned mid-run");
        self.pipeline.events.broadcast(EventPayload::StateChanged {
            job_id,
            state: ExportState::Failed,
        });
        self.pipeline.events.broadcast(EventPayload::JobFailed {
            job_id,
            kind: Error::Cancelled.kind().to_string(),
            error: Error::Cancelled.to_string(),
        });
    }
}
