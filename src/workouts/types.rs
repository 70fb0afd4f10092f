//! Workout types: flattened segments and the active workout timeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of a flattened workout segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SegmentKind {
    /// Constant power
    Steady,
    /// Linear power change
    Ramp,
    /// Gradual power increase at the start
    Warmup,
    /// Gradual power decrease at the end
    Cooldown,
    /// Work half of an interval repeat
    IntervalOn,
    /// Recovery half of an interval repeat
    IntervalOff,
}

impl std::fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentKind::Steady => write!(f, "Steady"),
            SegmentKind::Ramp => write!(f, "Ramp"),
            SegmentKind::Warmup => write!(f, "Warmup"),
            SegmentKind::Cooldown => write!(f, "Cooldown"),
            SegmentKind::IntervalOn => write!(f, "Interval On"),
            SegmentKind::IntervalOff => write!(f, "Interval Off"),
        }
    }
}

/// A single contiguous block of a workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSegment {
    /// Position in the flattened list
    pub index: usize,
    /// Segment kind
    pub kind: SegmentKind,
    /// Duration in seconds
    pub duration_seconds: u32,
    /// Power factor (fraction of FTP) at segment start
    pub start_factor: f64,
    /// Power factor (fraction of FTP) at segment end
    pub end_factor: f64,
}

impl WorkoutSegment {
    /// Interpolated power factor `elapsed` seconds into the segment
    pub fn factor_at(&self, elapsed: f64) -> f64 {
        if self.duration_seconds == 0 {
            return self.start_factor;
        }
        let progress = (elapsed / self.duration_seconds as f64).clamp(0.0, 1.0);
        self.start_factor + (self.end_factor - self.start_factor) * progress
    }
}

/// Where the workout stands at a given elapsed time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentPosition {
    /// Index of the segment covering the elapsed time
    pub index: usize,
    /// Interpolated power factor
    pub target_factor: f64,
    /// Seconds left in the segment
    pub remaining_seconds: f64,
    /// Start factor of the following segment, if any
    pub next_start_factor: Option<f64>,
}

/// A loaded workout: ordered, contiguous segments.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveWorkout {
    /// Workout name
    pub name: String,
    segments: Vec<WorkoutSegment>,
    total_duration_seconds: u32,
    /// Start offset of each segment
    #[serde(skip)]
    starts: Vec<u32>,
}

impl ActiveWorkout {
    /// Build a workout from already-flattened segments.
    ///
    /// Segment indices are reassigned to match their position.
    pub fn from_segments(
        name: impl Into<String>,
        mut segments: Vec<WorkoutSegment>,
    ) -> Result<Self, WorkoutError> {
        if segments.is_empty() {
            return Err(WorkoutError::Empty);
        }

        let mut starts = Vec::with_capacity(segments.len());
        let mut offset = 0u32;
        for (i, segment) in segments.iter_mut().enumerate() {
            if !segment.start_factor.is_finite() || !segment.end_factor.is_finite() {
                return Err(WorkoutError::InvalidSegment {
                    index: i,
                    reason: "power factor is not a number".to_string(),
                });
            }
            segment.index = i;
            starts.push(offset);
            offset = offset
                .checked_add(segment.duration_seconds)
                .ok_or(WorkoutError::TooLong)?;
        }

        if offset == 0 {
            return Err(WorkoutError::Empty);
        }

        Ok(Self {
            name: name.into(),
            segments,
            total_duration_seconds: offset,
            starts,
        })
    }

    /// Segments in order
    pub fn segments(&self) -> &[WorkoutSegment] {
        &self.segments
    }

    /// Sum of all segment durations (seconds)
    pub fn total_duration(&self) -> u32 {
        self.total_duration_seconds
    }

    /// Resolve the segment covering `elapsed` seconds.
    ///
    /// Returns `None` before the start and once `elapsed` reaches the total
    /// duration. Zero-length segments are never resolved.
    pub fn segment_at(&self, elapsed: f64) -> Option<SegmentPosition> {
        if elapsed.is_nan() || elapsed < 0.0 || elapsed >= self.total_duration_seconds as f64 {
            return None;
        }

        // Last segment starting at or before `elapsed`; any zero-length
        // segments sharing that start sort before it
        let index = self
            .starts
            .partition_point(|&start| start as f64 <= elapsed)
            .checked_sub(1)?;
        let segment = &self.segments[index];
        let in_segment = elapsed - self.starts[index] as f64;

        let next_start_factor = self.segments[index + 1..]
            .iter()
            .find(|s| s.duration_seconds > 0)
            .map(|s| s.start_factor);

        Some(SegmentPosition {
            index,
            target_factor: segment.factor_at(in_segment),
            remaining_seconds: segment.duration_seconds as f64 - in_segment,
            next_start_factor,
        })
    }
}

/// Errors related to workout operations.
#[derive(Debug, Error)]
pub enum WorkoutError {
    /// Workout has no segments or zero total duration
    #[error("Workout has no segments")]
    Empty,

    /// A segment cannot be used
    #[error("Invalid segment {index}: {reason}")]
    InvalidSegment { index: usize, reason: String },

    /// Total duration overflows
    #[error("Workout is too long")]
    TooLong,

    /// Workout file could not be read
    #[error("Failed to read workout file: {0}")]
    FileReadError(#[from] std::io::Error),

    /// Workout file is not valid JSON step data
    #[error("Failed to parse workout: {0}")]
    ParseError(#[from] serde_json::Error),
}
