//! The transient record of one export invocation.

use sp_core::{Error, ExportJobId, ExportState, Segment};

/// One export run: the segments it covers, how far it got, and its state.
///
/// Lives only for the duration of a single `export_*` call.
#[derive(Debug, Clone)]
pub struct ExportJob {
    id: ExportJobId,
    segments: Vec<Segment>,
    completed: usize,
    state: ExportState,
}

impl ExportJob {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self {
            id: ExportJobId::new(),
            segments,
            completed: 0,
            state: ExportState::Idle,
        }
    }

    pub fn id(&self) -> ExportJobId {
        self.id
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn state(&self) -> ExportState {
        self.state
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    /// `completed / total * 100`. A job with no segments reports 0 until it
    /// is done.
    pub fn progress_percent(&self) -> f32 {
        if self.state == ExportState::Done {
            return 100.0;
        }
        if self.segments.is_empty() {
            return 0.0;
        }
        self.completed as f32 / self.segments.len() as f32 * 100.0
    }

    /// Count one more segment as handled (encoded or skipped).
    pub fn complete_segment(&mut self) {
        self.completed = (self.completed + 1).min(self.segments.len());
    }

    /// Move to `next`.
    ///
    /// # Errors
    ///
    /// [`Error::Internal`] if the transition is not part of the export state
    /// machine.
    pub fn advance(&mut self, next: ExportState) -> sp_core::Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(Error::Internal(format!(
                "illegal export transition {} -> {next}",
                self.state
            )));
        }
        tracing::debug!("job {}: {} -> {next}", self.id, self.state);
        self.state = next;
        Ok(())
    }

    pub fn status(&self) -> ExportStatus {
        ExportStatus {
            job_id: Some(self.id),
            state: self.state,
            percent: self.progress_percent(),
        }
    }
}

/// Point-in-time view of the pipeline for observers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportStatus {
    /// The most recent job, if any has run.
    pub job_id: Option<ExportJobId>,
    pub state: ExportState,
    pub percent: f32,
}

impl Default for ExportStatus {
    fn default() -> Self {
        Self {
            job_id: None,
            state: ExportState::Idle,
            percent: 0.0,
        }
    }
}
