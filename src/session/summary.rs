//! End-of-session statistics.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::metrics::mmp::{MmpCalculator, PowerRecord};

/// Route name used when riding without a route
pub const FREE_RIDE_NAME: &str = "Free Ride";

/// Running totals kept by the control loop while recording.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStats {
    /// One power value per recorded tick (watts, never negative)
    pub power_samples: Vec<u32>,
    pub power_sum: u64,
    /// Distance ridden in meters
    pub distance: f64,
    /// Whether the loop stopped at the end of the route
    pub route_finished: bool,
    /// Effective rider weight when the loop stopped (kg)
    pub rider_weight_kg: f64,
}

impl SessionStats {
    pub fn record_power(&mut self, watts: i16) {
        let watts = watts.max(0) as u32;
        self.power_samples.push(watts);
        self.power_sum += watts as u64;
    }

    pub fn ticks(&self) -> usize {
        self.power_samples.len()
    }

    /// Mean power over recorded ticks (integer watts)
    pub fn average_power(&self) -> u32 {
        match self.ticks() {
            0 => 0,
            n => (self.power_sum / n as u64) as u32,
        }
    }
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub route_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_seconds: u64,
    /// Distance in meters
    pub distance: f64,
    pub avg_power: u32,
    pub avg_speed_kmh: f64,
    /// Best efforts at the standard durations
    pub power_records: Vec<PowerRecord>,
}

impl SessionSummary {
    /// Build the summary of a session that ran from `started_at` until now.
    ///
    /// Wall-clock duration includes pauses. An empty route name becomes
    /// "Free Ride"; `rider_weight_kg` must already have its fallback applied.
    pub fn build(
        route_name: &str,
        started_at: DateTime<Utc>,
        stats: &SessionStats,
        rider_weight_kg: f64,
    ) -> Self {
        let finished_at = Utc::now();
        let duration = (finished_at - started_at).num_milliseconds().max(0) as f64 / 1000.0;

        let avg_speed_kmh = if duration > 0.0 {
            stats.distance / duration * 3.6
        } else {
            0.0
        };

        let route_name = if route_name.is_empty() {
            FREE_RIDE_NAME.to_string()
        } else {
            route_name.to_string()
        };

        Self {
            route_name,
            started_at,
            finished_at,
            duration_seconds: duration as u64,
            distance: stats.distance,
            avg_power: stats.average_power(),
            avg_speed_kmh,
            power_records: MmpCalculator::default().records(&stats.power_samples, rider_weight_kg),
        }
    }
}
