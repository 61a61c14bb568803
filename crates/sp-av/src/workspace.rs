//! Scratch directories for encoder invocations.
//!
//! A [`Workspace`] owns a temporary directory holding the intermediate files
//! of one encode (staged input, encoder output). [`Workspace::close`] removes
//! it and logs, rather than returns, any failure: cleanup is best-effort and
//! must never turn a successful encode into a failed one.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Temporary directory for intermediate encoder files.
///
/// # Example
///
/// ```no_run
/// use sp_av::Workspace;
///
/// let workspace = Workspace::new("encode").unwrap();
/// let input = workspace.write("input.wav", b"RIFF....").unwrap();
/// // ... run the encoder against `input` ...
/// workspace.close();
/// ```
#[derive(Debug)]
pub struct Workspace {
    temp_dir: TempDir,
}

impl Workspace {
    /// Create a new workspace whose directory name starts with
    /// `splitforge-<label>-`.
    pub fn new(label: &str) -> sp_core::Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix(&format!("splitforge-{label}-"))
            .tempdir()
            .map_err(|e| sp_core::Error::tool("workspace", format!("failed to create temp dir: {e}")))?;

        Ok(Self { temp_dir })
    }

    /// Path to the temporary directory.
    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path for a named file inside the workspace.
    pub fn temp_file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Write `data` to a named file inside the workspace.
    pub fn write(&self, name: &str, data: &[u8]) -> sp_core::Result<PathBuf> {
        let path = self.temp_file(name);
        std::fs::write(&path, data)?;
        Ok(path)
    }

    /// Read a named file produced inside the workspace.
    ///
    /// A missing or empty file is reported as
    /// [`sp_core::Error::ResourceExhausted`]: the tool claimed success but
    /// produced nothing.
    pub fn read_output(&self, name: &str, tool: &str) -> sp_core::Result<Vec<u8>> {
        let path = self.temp_file(name);
        let data = std::fs::read(&path).map_err(|e| {
            sp_core::Error::resource_exhausted(tool, format!("no output at {}: {e}", path.display()))
        })?;
        if data.is_empty() {
            return Err(sp_core::Error::resource_exhausted(
                tool,
                format!("empty output at {}", path.display()),
            ));
        }
        Ok(data)
    }

    /// Remove the directory, logging a warning on failure.
    pub fn close(self) {
        let path = self.temp_dir.path().to_path_buf();
        if let Err(e) = self.temp_dir.close() {
            let err = sp_core::Error::cleanup(path.display(), e.to_string());
            tracing::warn!("{err}");
        }
    }
}
