//! Where finished segments go.

use std::path::PathBuf;

use bytes::Bytes;
use parking_lot::Mutex;

/// One encoded segment ready for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFile {
    /// 1-based segment ordinal.
    pub index: usize,
    pub file_name: String,
    pub mime: String,
    pub bytes: Bytes,
}

/// Receiver for finished outputs ("download" them, store them, ...).
///
/// Delivery cannot fail from the pipeline's point of view: by the time a
/// sink is called the whole set has been encoded. Sinks that can fail log
/// the problem themselves.
pub trait OutputSink: Send + Sync {
    fn deliver(&self, file: OutputFile);
}

/// Keeps delivered files in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    files: Mutex<Vec<OutputFile>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, in delivery order.
    pub fn files(&self) -> Vec<OutputFile> {
        self.files.lock().clone()
    }

    /// Drain delivered files.
    pub fn take(&self) -> Vec<OutputFile> {
        std::mem::take(&mut *self.files.lock())
    }
}

impl OutputSink for CollectingSink {
    fn deliver(&self, file: OutputFile) {
        self.files.lock().push(file);
    }
}

/// Writes each delivered file into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }
}

impl OutputSink for DirectorySink {
    fn deliver(&self, file: OutputFile) {
        let path = self.dir.join(&file.file_name);
        match std::fs::write(&path, &file.bytes) {
            Ok(()) => tracing::info!("wrote {} ({} bytes)", path.display(), file.bytes.len()),
            Err(e) => tracing::error!("failed to write {}: {e}", path.display()),
        }
    }
}
