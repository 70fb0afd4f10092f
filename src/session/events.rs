//! Events published by a session to its observers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::sensors::device::ConnectionStage;
use crate::session::summary::SessionSummary;
use crate::session::SessionState;
use crate::workouts::engine::WorkoutSnapshot;
use crate::workouts::types::ActiveWorkout;
use crate::world::route::RoutePoint;

/// How a workout ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkoutOutcome {
    Completed,
    Canceled,
}

/// Live ride data, produced once per control loop tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub timestamp: DateTime<Utc>,
    pub power: i16,
    pub cadence: u8,
    pub heart_rate: u8,
    pub speed_kmh: f64,
    /// Distance ridden in meters
    pub distance: f64,
    /// Road grade in percent
    pub grade: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

impl TelemetrySnapshot {
    pub fn new(
        power: i16,
        cadence: u8,
        heart_rate: u8,
        speed_mps: f64,
        distance: f64,
        point: &RoutePoint,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            power,
            cadence,
            heart_rate,
            speed_kmh: speed_mps * 3.6,
            distance,
            grade: point.grade,
            latitude: point.latitude,
            longitude: point.longitude,
            altitude: point.elevation,
        }
    }
}

/// Everything a session tells its observers, in the order it happened.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Progress of a device connection attempt
    ConnectionStatus {
        stage: ConnectionStage,
        message: String,
    },
    /// Session moved to a new state
    StateChanged(SessionState),
    /// Live ride data
    Telemetry(TelemetrySnapshot),
    /// Workout progress, alongside telemetry while a workout runs
    Workout(WorkoutSnapshot),
    /// A workout was loaded (full structure, for charting)
    WorkoutLoaded(ActiveWorkout),
    WorkoutFinished(WorkoutOutcome),
    /// The rider reached the end of the route
    RouteFinished,
    SessionFinished(SessionSummary),
    /// Informational message for the rider
    Log(String),
}
