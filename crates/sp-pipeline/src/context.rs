//! Per-export context: the source being cut, cancellation, and progress.

use std::sync::Arc;

use sp_av::MediaSource;
use sp_core::ExportState;
use tokio_util::sync::CancellationToken;

/// Sender for reporting export progress.
///
/// Wraps a callback that receives the progress percentage (0.0 -- 100.0) and
/// the coarse state the job is in.
pub struct ProgressSender {
    callback: Box<dyn Fn(f32, ExportState) + Send + Sync>,
}

impl ProgressSender {
    /// Create a new sender from the given callback.
    pub fn new(callback: impl Fn(f32, ExportState) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Create a no-op sender that discards all progress reports.
    pub fn noop() -> Self {
        Self {
            callback: Box::new(|_, _| {}),
        }
    }

    /// Report progress.
    pub fn send(&self, percent: f32, state: ExportState) {
        (self.callback)(percent, state);
    }
}

impl std::fmt::Debug for ProgressSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSender").finish_non_exhaustive()
    }
}

/// Everything one export run needs besides the pipeline itself.
#[derive(Debug, Clone)]
pub struct ExportContext {
    /// The loaded source, shared read-only with the session.
    pub source: Arc<MediaSource>,
    /// Checked between segments; when cancelled the job fails without
    /// delivering anything.
    pub cancellation: CancellationToken,
    /// Receives a report after every state change and every segment.
    pub progress: Arc<ProgressSender>,
}

impl ExportContext {
    pub fn new(source: Arc<MediaSource>) -> Self {
        Self {
            source,
            cancellation: CancellationToken::new(),
            progress: Arc::new(ProgressSender::noop()),
        }
    }

    /// Builder: attach a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Builder: attach a progress sender.
    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Arc::new(progress);
        self
    }
}
