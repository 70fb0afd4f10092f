//! Parsed workout steps and their flattening into segments.
//!
//! Steps arrive already parsed from a workout file (JSON here); repeats are
//! expanded once, at load time.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::workouts::types::{ActiveWorkout, SegmentKind, WorkoutError, WorkoutSegment};

/// One step of a structured workout, before flattening.
///
/// Power values are fractions of FTP (1.0 = 100%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkoutStep {
    SteadyState {
        duration: u32,
        power: f64,
    },
    /// Treated as steady at the given factor
    FreeRide {
        duration: u32,
        #[serde(default)]
        power: f64,
    },
    Ramp {
        duration: u32,
        power_low: f64,
        power_high: f64,
    },
    Warmup {
        duration: u32,
        power_low: f64,
        power_high: f64,
    },
    Cooldown {
        duration: u32,
        power_low: f64,
        power_high: f64,
    },
    /// `repeat` on/off pairs
    Intervals {
        repeat: u32,
        on_duration: u32,
        off_duration: u32,
        on_power: f64,
        off_power: f64,
    },
}

/// A named list of steps, the on-disk workout format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutPlan {
    pub name: String,
    pub steps: Vec<WorkoutStep>,
}

impl WorkoutPlan {
    /// Parse a plan from JSON
    pub fn from_json(content: &str) -> Result<Self, WorkoutError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Flatten into a ready-to-run workout
    pub fn into_workout(self) -> Result<ActiveWorkout, WorkoutError> {
        ActiveWorkout::from_steps(self.name, &self.steps)
    }
}

/// Load a JSON workout plan from disk and flatten it
pub fn load_workout_file(path: &Path) -> Result<ActiveWorkout, WorkoutError> {
    let content = std::fs::read_to_string(path)?;
    let workout = WorkoutPlan::from_json(&content)?.into_workout()?;
    tracing::info!(
        "Workout '{}' loaded: {} segments, {}s",
        workout.name,
        workout.segments().len(),
        workout.total_duration()
    );
    Ok(workout)
}

/// Expand steps into contiguous segments
pub fn flatten_steps(steps: &[WorkoutStep]) -> Vec<WorkoutSegment> {
    let mut segments = Vec::new();
    let mut push = |kind, duration_seconds, start_factor, end_factor| {
        segments.push(WorkoutSegment {
            index: segments.len(),
            kind,
            duration_seconds,
            start_factor,
            end_factor,
        });
    };

    for step in steps {
        match *step {
            WorkoutStep::SteadyState { duration, power }
            | WorkoutStep::FreeRide { duration, power } => {
                push(SegmentKind::Steady, duration, power, power)
            }
            WorkoutStep::Ramp {
                duration,
                power_low,
                power_high,
            } => push(SegmentKind::Ramp, duration, power_low, power_high),
            WorkoutStep::Warmup {
                duration,
                power_low,
                power_high,
            } => push(SegmentKind::Warmup, duration, power_low, power_high),
            WorkoutStep::Cooldown {
                duration,
                power_low,
                power_high,
            } => push(SegmentKind::Cooldown, duration, power_low, power_high),
            WorkoutStep::Intervals {
                repeat,
                on_duration,
                off_duration,
                on_power,
                off_power,
            } => {
                for _ in 0..repeat {
                    push(SegmentKind::IntervalOn, on_duration, on_power, on_power);
                    push(SegmentKind::IntervalOff, off_duration, off_power, off_power);
                }
            }
        }
    }

    segments
}

impl ActiveWorkout {
    /// Flatten parsed steps into a workout
    pub fn from_steps(
        name: impl Into<String>,
        steps: &[WorkoutStep],
    ) -> Result<Self, WorkoutError> {
        Self::from_segments(name, flatten_steps(steps))
    }
}
