//! The editing session: one loaded source, its split points, and the export
//! pipeline that turns them into files.
//!
//! All timeline edits go through [`EditSession::apply`]. While an export is
//! running the split-point set is frozen; edits are queued and replayed once
//! the export settles ([`MutationPolicy::Defer`]) or refused with
//! [`Error::Busy`] ([`MutationPolicy::Reject`]).

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;
use sp_av::{Encoder, FfmpegEncoder, MediaLoader, MediaSource};
use sp_core::config::{Config, MutationPolicy};
use sp_core::events::EventBus;
use sp_core::{
    CommandOutcome, Error, MediaKind, Segment, SourceId, SplitPointId, Timeline, TimelineCommand,
};
use sp_pipeline::{
    ExportContext, ExportPipeline, ExportReport, ExportStatus, OutputSink, PlannedOutput,
    ProgressSender,
};
use tokio_util::sync::CancellationToken;

/// Result of submitting a timeline command.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// The command ran immediately.
    Now(CommandOutcome),
    /// An export is running; the command will run when it settles.
    Deferred,
}

/// Which segments an export covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportScope {
    All,
    /// One segment, by 1-based ordinal.
    Single(usize),
}

/// Serializable view of the session for a front end.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub source: Option<SourceSummary>,
    pub segments: Vec<Segment>,
    pub exporting: bool,
    pub pending_commands: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub id: SourceId,
    pub file_name: String,
    pub kind: MediaKind,
    pub duration: f64,
}

#[derive(Debug, Default)]
struct SessionState {
    source: Option<Arc<MediaSource>>,
    timeline: Option<Timeline>,
    pending: Vec<TimelineCommand>,
    export: Option<CancellationToken>,
}

/// Controller owning the timeline, the loaded source, and the pipeline.
pub struct EditSession {
    config: Config,
    pipeline: ExportPipeline,
    state: Mutex<SessionState>,
}

impl EditSession {
    /// Session exporting through `encoder` into `sink`.
    pub fn new(config: Config, encoder: Arc<dyn Encoder>, sink: Arc<dyn OutputSink>) -> Self {
        let pipeline = ExportPipeline::new(encoder, sink).with_config(config.export.clone());
        Self {
            config,
            pipeline,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Session backed by ffmpeg, located per `config.tools`.
    pub fn with_ffmpeg(config: Config, sink: Arc<dyn OutputSink>) -> Self {
        let encoder = Arc::new(FfmpegEncoder::from_config(&config.tools));
        Self::new(config, encoder, sink)
    }

    /// Builder: publish export events on a shared bus.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.pipeline = self.pipeline.with_events(events);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn events(&self) -> &Arc<EventBus> {
        self.pipeline.events()
    }

    /// Replace the source wholesale. Split points and queued edits are
    /// discarded and the encoder drops anything staged for the old source.
    ///
    /// # Errors
    ///
    /// [`Error::Busy`] while an export is running.
    pub async fn load_source(&self, source: MediaSource) -> sp_core::Result<SourceId> {
        let id = source.id();
        {
            let mut state = self.state.lock();
            if state.export.is_some() {
                return Err(Error::Busy("cannot replace the source during an export".into()));
            }
            let timeline = Timeline::new(source.duration())?;
            tracing::info!(
                "loaded {} ({}, {:.3}s)",
                source.file_name(),
                source.kind(),
                source.duration()
            );
            state.timeline = Some(timeline);
            state.source = Some(Arc::new(source));
            state.pending.clear();
        }
        self.pipeline.encoder().release().await;
        Ok(id)
    }

    /// Decode `bytes` with `loader` and load the result.
    pub async fn load_bytes(
        &self,
        loader: &MediaLoader,
        file_name: &str,
        bytes: Bytes,
        hint: Option<MediaKind>,
    ) -> sp_core::Result<SourceId> {
        let source = loader.load(file_name, bytes, hint).await?;
        self.load_source(source).await
    }

    pub fn source(&self) -> Option<Arc<MediaSource>> {
        self.state.lock().source.clone()
    }

    /// Copy of the current timeline.
    pub fn timeline(&self) -> Option<Timeline> {
        self.state.lock().timeline.clone()
    }

    /// Current segments; empty when nothing is loaded.
    pub fn segments(&self) -> Vec<Segment> {
        self.state
            .lock()
            .timeline
            .as_ref()
            .map(Timeline::segments)
            .unwrap_or_default()
    }

    pub fn is_exporting(&self) -> bool {
        self.state.lock().export.is_some()
    }

    /// Number of edits waiting for the running export to settle.
    pub fn pending_commands(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn export_status(&self) -> ExportStatus {
        self.pipeline.status()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();
        SessionSnapshot {
            source: state.source.as_ref().map(|s| SourceSummary {
                id: s.id(),
                file_name: s.file_name().to_string(),
                kind: s.kind(),
                duration: s.duration(),
            }),
            segments: state
                .timeline
                .as_ref()
                .map(Timeline::segments)
                .unwrap_or_default(),
            exporting: state.export.is_some(),
            pending_commands: state.pending.len(),
        }
    }

    /// Output names and size estimates for the current segments.
    pub fn plan(&self) -> Vec<PlannedOutput> {
        let state = self.state.lock();
        match (&state.source, &state.timeline) {
            (Some(source), Some(timeline)) => self.pipeline.plan(source, timeline),
            _ => Vec::new(),
        }
    }

    // -- Timeline commands ----------------------------------------------------

    /// Run a timeline command, or queue/refuse it during an export.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] when no source is loaded; [`Error::Busy`] during
    /// an export under [`MutationPolicy::Reject`].
    pub fn apply(&self, command: TimelineCommand) -> sp_core::Result<Applied> {
        let mut state = self.state.lock();
        if state.timeline.is_none() {
            return Err(Error::Validation("no media loaded".into()));
        }

        if state.export.is_some() {
            return match self.config.session.mutation_policy {
                MutationPolicy::Defer => {
                    tracing::debug!("export running; deferring {command:?}");
                    state.pending.push(command);
                    Ok(Applied::Deferred)
                }
                MutationPolicy::Reject => Err(Error::Busy(
                    "split points cannot change while an export is running".into(),
                )),
            };
        }

        let timeline = state
            .timeline
            .as_mut()
            .ok_or_else(|| Error::Internal("timeline vanished".into()))?;
        Ok(Applied::Now(timeline.apply(&command)))
    }

    pub fn add_split_point(&self, time: f64) -> sp_core::Result<Applied> {
        self.apply(TimelineCommand::Add { time })
    }

    pub fn update_split_point(&self, id: SplitPointId, time: f64) -> sp_core::Result<Applied> {
        self.apply(TimelineCommand::Update { id, time })
    }

    pub fn remove_split_point(&self, id: SplitPointId) -> sp_core::Result<Applied> {
        self.apply(TimelineCommand::Remove { id })
    }

    pub fn delete_segment_by_merge(&self, index: usize) -> sp_core::Result<Applied> {
        self.apply(TimelineCommand::MergeDelete { index })
    }

    // -- Export -----------------------------------------------------------------

    pub async fn export_all(&self) -> sp_core::Result<ExportReport> {
        self.export(ExportScope::All, ProgressSender::noop()).await
    }

    pub async fn export_single(&self, index: usize) -> sp_core::Result<ExportReport> {
        self.export(ExportScope::Single(index), ProgressSender::noop()).await
    }

    /// Run an export over a frozen copy of the timeline.
    ///
    /// # Errors
    ///
    /// [`Error::Busy`] if an export is already running, [`Error::Validation`]
    /// when nothing is loaded, otherwise whatever the pipeline reports.
    pub async fn export(
        &self,
        scope: ExportScope,
        progress: ProgressSender,
    ) -> sp_core::Result<ExportReport> {
        let token = CancellationToken::new();
        let (source, timeline) = {
            let mut state = self.state.lock();
            if state.export.is_some() {
                return Err(Error::Busy("an export is already in progress".into()));
            }
            let (Some(source), Some(timeline)) = (state.source.clone(), state.timeline.clone())
            else {
                return Err(Error::Validation("no media loaded".into()));
            };
            state.export = Some(token.clone());
            (source, timeline)
        };
        let _settle = SettleGuard { session: self };

        let ctx = ExportContext::new(source)
            .with_cancellation(token)
            .with_progress(progress);
        match scope {
            ExportScope::All => self.pipeline.export_all(&ctx, &timeline).await,
            ExportScope::Single(index) => self.pipeline.export_single(&ctx, &timeline, index).await,
        }
    }

    /// Ask the running export to stop at the next segment boundary.
    /// Returns `false` if nothing is running.
    pub fn cancel_export(&self) -> bool {
        match &self.state.lock().export {
            Some(token) => {
                tracing::info!("cancelling export");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// End the export window and replay deferred edits in arrival order.
    fn settle(&self) {
        let mut state = self.state.lock();
        state.export = None;
        let pending = std::mem::take(&mut state.pending);
        if pending.is_empty() {
            return;
        }
        tracing::info!("applying {} deferred timeline edit(s)", pending.len());
        if let Some(timeline) = state.timeline.as_mut() {
            for command in &pending {
                timeline.apply(command);
            }
        }
    }
}

impl std::fmt::Debug for EditSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditSession")
            .field("pipeline", &self.pipeline)
            .field("state", &*self.state.lock())
            .finish()
    }
}

/// Settles the session when an export ends, including when its future is
/// dropped mid-flight.
struct SettleGuard<'a> {
    session: &'a EditSession,
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        self.session.settle();
    }
}
