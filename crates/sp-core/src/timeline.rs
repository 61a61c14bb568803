//! Split points and the segments derived from them.
//!
//! A [`Timeline`] owns an ordered set of [`SplitPoint`]s over a fixed
//! duration. Sorted order is maintained by the mutation methods themselves
//! (insert at the partition point), so [`Timeline::segments`] never has to
//! sort and always yields a gap-free partition of `[0, duration]`.
//!
//! Bad input is recovered locally: times are clamped into range and unknown
//! ids are ignored. Nothing here returns an error except construction with a
//! non-finite duration.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ids::SplitPointId;
use crate::Error;

/// A user-chosen boundary between two output segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitPoint {
    pub id: SplitPointId,
    /// Seconds from the start of the source, within `[0, duration]`.
    pub time: f64,
    pub label: String,
}

/// One contiguous span `[start, end)` of the source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// 1-based ordinal in time order.
    pub index: usize,
    pub start: f64,
    pub end: f64,
}

impl Segment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// True when both boundaries coincide.
    pub fn is_degenerate(&self) -> bool {
        self.duration() <= 0.0
    }
}

/// An edit gesture resolved to one timeline operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TimelineCommand {
    Add { time: f64 },
    Update { id: SplitPointId, time: f64 },
    Remove { id: SplitPointId },
    MergeDelete { index: usize },
}

/// What a [`TimelineCommand`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Added(SplitPointId),
    Updated(SplitPointId),
    Removed(SplitPoint),
    /// The command referred to something that does not exist.
    Ignored,
}

/// Sorted split points over a fixed duration.
#[derive(Debug, Clone)]
pub struct Timeline {
    duration: f64,
    points: Vec<SplitPoint>,
}

impl Timeline {
    /// Create an empty timeline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `duration` is negative or not finite.
    pub fn new(duration: f64) -> Result<Self> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(Error::Validation(format!(
                "timeline duration must be a finite non-negative number, got {duration}"
            )));
        }
        Ok(Self {
            duration,
            points: Vec::new(),
        })
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Split points in ascending time order.
    pub fn points(&self) -> &[SplitPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, id: SplitPointId) -> Option<&SplitPoint> {
        self.points.iter().find(|p| p.id == id)
    }

    /// Add a split point, clamping `time` into `[0, duration]`.
    ///
    /// The label is `"Split N"` with N one past the current count. Labels are
    /// never renumbered afterwards. A point landing on an existing time is
    /// placed after it.
    pub fn add(&mut self, time: f64) -> SplitPointId {
        let point = SplitPoint {
            id: SplitPointId::new(),
            time: self.clamp(time),
            label: format!("Split {}", self.points.len() + 1),
        };
        let id = point.id;
        tracing::debug!(%id, time = point.time, "split point added");
        self.insert_sorted(point);
        id
    }

    /// Move an existing split point. Unknown ids are ignored.
    ///
    /// Returns `true` if a point was moved.
    pub fn update(&mut self, id: SplitPointId, time: f64) -> bool {
        let Some(pos) = self.position(id) else {
            tracing::debug!(%id, "update ignored: unknown split point");
            return false;
        };
        let mut point = self.points.remove(pos);
        point.time = self.clamp(time);
        self.insert_sorted(point);
        true
    }

    /// Remove a split point. Unknown ids are ignored.
    pub fn remove(&mut self, id: SplitPointId) -> Option<SplitPoint> {
        let pos = self.position(id)?;
        Some(self.points.remove(pos))
    }

    /// Drop every split point.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Derive the segment list from `[0, times..., duration]`.
    ///
    /// Always returns `len() + 1` segments.
    pub fn segments(&self) -> Vec<Segment> {
        let mut bounds = Vec::with_capacity(self.points.len() + 2);
        bounds.push(0.0);
        bounds.extend(self.points.iter().map(|p| p.time));
        bounds.push(self.duration);

        bounds
            .windows(2)
            .enumerate()
            .map(|(i, w)| Segment {
                index: i + 1,
                start: w[0],
                end: w[1],
            })
            .collect()
    }

    /// The segment with the given 1-based ordinal.
    pub fn segment(&self, index: usize) -> Option<Segment> {
        if index == 0 || index > self.points.len() + 1 {
            return None;
        }
        let start = if index == 1 {
            0.0
        } else {
            self.points[index - 2].time
        };
        let end = self.points.get(index - 1).map_or(self.duration, |p| p.time);
        Some(Segment { index, start, end })
    }

    /// Delete a segment by merging it into a neighbour.
    ///
    /// The last segment merges backward (the boundary before it is removed);
    /// any other segment merges forward (the boundary after it is removed).
    /// Out-of-range indices, and a timeline with a single segment, are
    /// no-ops.
    pub fn merge_delete(&mut self, index: usize) -> Option<SplitPoint> {
        let count = self.points.len() + 1;
        if index == 0 || index > count || self.points.is_empty() {
            return None;
        }
        let boundary = if index == count { index - 2 } else { index - 1 };
        let removed = self.points.remove(boundary);
        tracing::debug!(segment = index, time = removed.time, "segment merged");
        Some(removed)
    }

    /// Apply one command.
    pub fn apply(&mut self, command: &TimelineCommand) -> CommandOutcome {
        match *command {
            TimelineCommand::Add { time } => CommandOutcome::Added(self.add(time)),
            TimelineCommand::Update { id, time } => {
                if self.update(id, time) {
                    CommandOutcome::Updated(id)
                } else {
                    CommandOutcome::Ignored
                }
            }
            TimelineCommand::Remove { id } => self
                .remove(id)
                .map_or(CommandOutcome::Ignored, CommandOutcome::Removed),
            TimelineCommand::MergeDelete { index } => self
                .merge_delete(index)
                .map_or(CommandOutcome::Ignored, CommandOutcome::Removed),
        }
    }

    fn clamp(&self, time: f64) -> f64 {
        if time.is_nan() {
            0.0
        } else {
            time.clamp(0.0, self.duration)
        }
    }

    fn position(&self, id: SplitPointId) -> Option<usize> {
        self.points.iter().position(|p| p.id == id)
    }

    fn insert_sorted(&mut self, point: SplitPoint) {
        let at = self.points.partition_point(|p| p.time <= point.time);
        self.points.insert(at, point);
    }
}
