//! Structured workouts: flattened segments and the execution cursor.

pub mod engine;
pub mod plan;
pub mod types;

pub use engine::{effective_ftp, WorkoutEngine, WorkoutSnapshot, DEFAULT_FTP_WATTS};
pub use plan::{flatten_steps, load_workout_file, WorkoutPlan, WorkoutStep};
pub use types::{ActiveWorkout, SegmentKind, SegmentPosition, WorkoutError, WorkoutSegment};
