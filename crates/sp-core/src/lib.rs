//! sp-core: shared types, IDs, errors, configuration, events and the
//! split-point timeline.
//!
//! This crate is the foundational dependency for the other sp-* crates. The
//! [`timeline`] module is pure data: it knows nothing about media bytes or
//! encoders and can be driven directly by an editing front end.

pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod media;
pub mod timeline;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, ErrorKind, Result};
pub use events::ExportState;
pub use ids::*;
pub use media::*;
pub use timeline::{CommandOutcome, Segment, SplitPoint, Timeline, TimelineCommand};
