//! Unified error type for splitforge.
//!
//! All crates funnel their failures into [`Error`], which carries enough
//! context for the caller to tell the failure classes apart via
//! [`Error::kind`].

use std::fmt;

/// Coarse classification of an [`Error`].
///
/// A presentation layer only needs this to decide what to tell the user:
/// validation problems are recovered locally, initialization failures can be
/// retried by calling again, encode failures abort the export, and cleanup
/// failures never reach the caller at all (they are logged).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Initialization,
    Encode,
    ResourceCleanup,
    Busy,
    Cancelled,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Initialization => write!(f, "initialization"),
            Self::Encode => write!(f, "encode"),
            Self::ResourceCleanup => write!(f, "resource_cleanup"),
            Self::Busy => write!(f, "busy"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Unified error type covering all failure modes in splitforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The encoder was used before `ensure_ready` succeeded.
    #[error("Encoder not ready: {0}")]
    NotReady(String),

    /// Every configured encoder source failed to initialize.
    #[error("Encoder initialization failed after {} attempt(s): {}", attempts.len(), attempts.join("; "))]
    Initialization {
        /// One entry per source tried, in priority order.
        attempts: Vec<String>,
    },

    /// The encoder refused the input (empty or malformed).
    #[error("Encode rejected: {0}")]
    EncodeRejected(String),

    /// The underlying encode engine reported an internal failure.
    #[error("Encoder resource exhausted [{tool}]: {message}")]
    ResourceExhausted {
        /// Engine that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Removing a transient artifact failed.
    #[error("Cleanup failed for {path}: {message}")]
    Cleanup {
        /// Artifact that could not be removed.
        path: String,
        /// Human-readable error description.
        message: String,
    },

    /// A segment spans zero samples and cannot be encoded.
    #[error("Segment {index} is empty")]
    EmptySegment {
        /// 1-based segment ordinal.
        index: usize,
    },

    /// Another export is already running.
    #[error("Busy: {0}")]
    Busy(String),

    /// The export was cancelled between segments.
    #[error("Export cancelled")]
    Cancelled,

    /// A segment failed during an export; wraps the underlying cause.
    #[error("Export failed at segment {index}: {source}")]
    Export {
        /// 1-based ordinal of the segment that failed.
        index: usize,
        /// The underlying failure.
        source: Box<Error>,
    },

    /// An external tool (ffmpeg, ffprobe) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Media probing failed.
    #[error("Probe error: {0}")]
    Probe(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Classify this error.
    ///
    /// [`Error::Export`] reports the kind of the wrapped cause.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) | Error::EmptySegment { .. } | Error::Probe(_) => {
                ErrorKind::Validation
            }
            Error::NotReady(_) | Error::Initialization { .. } => ErrorKind::Initialization,
            Error::EncodeRejected(_) | Error::ResourceExhausted { .. } | Error::Tool { .. } => {
                ErrorKind::Encode
            }
            Error::Cleanup { .. } => ErrorKind::ResourceCleanup,
            Error::Busy(_) => ErrorKind::Busy,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Export { source, .. } => source.kind(),
            Error::Io { .. } | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether calling the same operation again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Initialization | ErrorKind::Busy | ErrorKind::Cancelled
        )
    }

    /// Convenience constructor for [`Error::Initialization`].
    pub fn initialization(attempts: Vec<String>) -> Self {
        Error::Initialization { attempts }
    }

    /// Convenience constructor for [`Error::ResourceExhausted`].
    pub fn resource_exhausted(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ResourceExhausted {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Cleanup`].
    pub fn cleanup(path: impl fmt::Display, message: impl Into<String>) -> Self {
        Error::Cleanup {
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Wrap `self` as the failure of segment `index`.
    pub fn at_segment(self, index: usize) -> Self {
        match self {
            // Already attributed; don't nest.
            e @ Error::Export { .. } => e,
            e @ Error::Cancelled => e,
            other => Error::Export {
                index,
                source: Box::new(other),
            },
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
