//! Splitforge - cut a media file at chosen points and export every span as
//! its own file.
//!
//! The library is a thin controller over the workspace crates:
//!
//! - [`sp_core`] -- errors, configuration, events, and the split-point
//!   [`Timeline`](sp_core::Timeline);
//! - [`sp_av`] -- media sources, segment extraction, and encoders;
//! - [`sp_pipeline`] -- the export pipeline.
//!
//! [`EditSession`] ties them together for one editing front end.

pub mod logging;
pub mod session;

pub use session::{Applied, EditSession, ExportScope, SessionSnapshot, SourceSummary};

pub use sp_av;
pub use sp_core;
pub use sp_pipeline;
