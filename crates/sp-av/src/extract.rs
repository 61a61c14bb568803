//! Segment extraction: turn a `[start, end)` span of a source into something
//! the encoder can consume on its own.
//!
//! Audio is sliced in memory at sample granularity. Video is never decoded
//! here; extraction yields a [`CutSpec`] that the encoder applies to the
//! original file. With stream-copy cutting, a boundary that does not fall on
//! a keyframe snaps to the previous keyframe, so video cut points are only as
//! precise as the source's keyframe spacing.

use sp_core::Segment;

use crate::pcm::AudioBuffer;
use crate::source::{MediaSource, SourceDetails};

/// A container-level cut to apply to a video source, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutSpec {
    pub start: f64,
    pub end: f64,
}

impl CutSpec {
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// The standalone representation of one segment.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    Audio(AudioBuffer),
    Cut(CutSpec),
}

impl Extracted {
    /// True when the span contains no samples (audio) or no time (video).
    /// Empty extractions must not be sent to an encoder.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Audio(pcm) => pcm.is_empty(),
            Self::Cut(cut) => cut.duration() <= 0.0,
        }
    }
}

/// Sample index for `time` seconds: `round(time * rate)`, never negative.
pub fn sample_index(time: f64, sample_rate: u32) -> usize {
    let idx = (time * f64::from(sample_rate)).round();
    if idx.is_nan() || idx <= 0.0 {
        0
    } else {
        idx as usize
    }
}

/// Extract `segment` from `source`.
pub fn extract(source: &MediaSource, segment: &Segment) -> Extracted {
    extract_span(source, segment.start, segment.end)
}

/// Extract the span `[start, end)` from `source` without modifying it.
pub fn extract_span(source: &MediaSource, start: f64, end: f64) -> Extracted {
    match source.details() {
        SourceDetails::Audio(pcm) => Extracted::Audio(slice_audio(pcm, start, end)),
        SourceDetails::Video(info) => {
            let end = end.min(info.duration);
            let start = start.clamp(0.0, end.max(0.0));
            Extracted::Cut(CutSpec { start, end })
        }
    }
}

/// Copy the samples of `[start, end)` seconds into a new buffer.
///
/// The end index is clamped to the buffer length; a start at or past the end
/// gives an empty buffer with the same layout.
pub fn slice_audio(pcm: &AudioBuffer, start: f64, end: f64) -> AudioBuffer {
    let rate = pcm.sample_rate();
    pcm.slice(sample_index(start, rate), sample_index(end, rate))
}
