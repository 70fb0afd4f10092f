//! Workout execution cursor.
//!
//! The engine owns an [`ActiveWorkout`] and the elapsed ride time spent in
//! it. It is advanced by the control loop each tick and turns the current
//! segment into watts for the trainer.

use serde::Serialize;

use crate::workouts::types::{ActiveWorkout, SegmentPosition};

/// FTP used when the rider profile has none
pub const DEFAULT_FTP_WATTS: u32 = 200;

/// FTP in watts with the fallback applied
pub fn effective_ftp(ftp_watts: u32) -> f64 {
    if ftp_watts == 0 {
        DEFAULT_FTP_WATTS as f64
    } else {
        ftp_watts as f64
    }
}

/// Workout progress as shown to the rider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkoutSnapshot {
    pub workout_name: String,
    pub segment_index: usize,
    /// Whole seconds left in the current segment
    pub segment_remaining_seconds: u32,
    pub target_power: u32,
    pub next_target_power: u32,
    pub completion_percent: f64,
    pub intensity_percent: u32,
}

/// Workout execution engine.
#[derive(Debug, Clone)]
pub struct WorkoutEngine {
    workout: ActiveWorkout,
    /// Ride time spent in the workout (seconds, excludes pauses)
    elapsed: f64,
}

impl WorkoutEngine {
    /// Start a workout at t = 0
    pub fn new(workout: ActiveWorkout) -> Self {
        tracing::info!(
            "Workout started: {} ({} segments)",
            workout.name,
            workout.segments().len()
        );
        Self {
            workout,
            elapsed: 0.0,
        }
    }

    /// The workout being executed
    pub fn workout(&self) -> &ActiveWorkout {
        &self.workout
    }

    /// Elapsed workout time in seconds
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Move the cursor forward. Negative or non-finite steps are ignored.
    pub fn advance(&mut self, dt_seconds: f64) {
        if dt_seconds.is_finite() && dt_seconds > 0.0 {
            self.elapsed += dt_seconds;
        }
    }

    /// Current segment, or `None` once finished
    pub fn position(&self) -> Option<SegmentPosition> {
        self.workout.segment_at(self.elapsed)
    }

    /// Whether elapsed time has reached the end of the workout
    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.workout.total_duration() as f64
    }

    /// Target watts for the current segment: factor × FTP × intensity
    pub fn target_watts(&self, ftp_watts: u32, intensity: f64) -> Option<f64> {
        self.position()
            .map(|pos| pos.target_factor * effective_ftp(ftp_watts) * intensity)
    }

    /// Start target of the following segment at nominal intensity.
    ///
    /// Zero when the current segment is the last one.
    pub fn next_target_watts(&self, ftp_watts: u32) -> f64 {
        self.position()
            .and_then(|pos| pos.next_start_factor)
            .map(|factor| factor * effective_ftp(ftp_watts))
            .unwrap_or(0.0)
    }

    /// Completion in percent, clamped to [0, 100]
    pub fn completion_percent(&self) -> f64 {
        let total = self.workout.total_duration() as f64;
        if total <= 0.0 {
            return 100.0;
        }
        (self.elapsed / total * 100.0).clamp(0.0, 100.0)
    }

    /// Snapshot for display, or `None` once finished
    pub fn snapshot(&self, ftp_watts: u32, intensity: f64) -> Option<WorkoutSnapshot> {
        let pos = self.position()?;
        let target = pos.target_factor * effective_ftp(ftp_watts) * intensity;

        Some(WorkoutSnapshot {
            workout_name: self.workout.name.clone(),
            segment_index: pos.index,
            segment_remaining_seconds: pos.remaining_seconds.max(0.0) as u32,
            target_power: target.max(0.0).round() as u32,
            next_target_power: self.next_target_watts(ftp_watts).max(0.0).round() as u32,
            completion_percent: self.completion_percent(),
            intensity_percent: (intensity * 100.0).round() as u32,
        })
    }
}
