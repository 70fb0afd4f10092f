//! Distance-indexed route model
//!
//! Routes are built once from an ordered list of GPS points: distance is
//! accumulated along the track and a smoothed grade is attached to every
//! point. Lookups by ridden distance are O(log n).

use crate::world::import::{distance_3d, GpsPoint};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Half-width of the grade smoothing window, in points
pub const GRADE_WINDOW_POINTS: usize = 5;
/// Windows spanning less distance than this report a flat grade
pub const MIN_GRADE_WINDOW_M: f64 = 10.0;
/// Grade is clamped to ±this value (percent)
pub const MAX_GRADE_PERCENT: f64 = 25.0;

/// A point along a route
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    /// GPS latitude
    #[serde(rename = "lat")]
    pub latitude: f64,
    /// GPS longitude
    #[serde(rename = "lon")]
    pub longitude: f64,
    /// Elevation in meters
    pub elevation: f64,
    /// Distance from route start in meters
    pub distance: f64,
    /// Smoothed grade as a percentage
    pub grade: f64,
}

/// Errors raised while building a route
#[derive(Debug, Error, PartialEq)]
pub enum RouteError {
    #[error("Route needs at least 2 points, got {0}")]
    TooFewPoints(usize),

    #[error("Distance decreases at point {index}")]
    NonMonotonicDistance { index: usize },

    #[error("Distance is not a finite number at point {index}")]
    NonFiniteDistance { index: usize },
}

/// A loaded route, immutable after construction
#[derive(Debug, Clone, Default)]
pub struct Route {
    name: String,
    points: Vec<RoutePoint>,
}

impl Route {
    /// Build a route from raw GPS points, accumulating 3D distance.
    pub fn load(name: impl Into<String>, raw: &[GpsPoint]) -> Result<Self, RouteError> {
        if raw.len() < 2 {
            return Err(RouteError::TooFewPoints(raw.len()));
        }

        let mut points = Vec::with_capacity(raw.len());
        let mut total = 0.0;
        let mut last_elevation = raw[0].elevation.unwrap_or(0.0);
        let mut previous: Option<&GpsPoint> = None;

        for point in raw {
            let elevation = point.elevation.unwrap_or(last_elevation);
            if let Some(prev) = previous {
                total += distance_3d(prev, point, last_elevation, elevation);
            }

            points.push(RoutePoint {
                latitude: point.latitude,
                longitude: point.longitude,
                elevation,
                distance: total,
                grade: 0.0,
            });

            last_elevation = elevation;
            previous = Some(point);
        }

        smooth_grades(&mut points);

        let route = Self {
            name: name.into(),
            points,
        };
        tracing::info!(
            "Route loaded: {} points | {:.2} km",
            route.points.len(),
            route.total_distance() / 1000.0
        );
        Ok(route)
    }

    /// Build a route from points that already carry cumulative distance.
    ///
    /// Any grade on the input is recomputed.
    pub fn from_points(
        name: impl Into<String>,
        mut points: Vec<RoutePoint>,
    ) -> Result<Self, RouteError> {
        if points.len() < 2 {
            return Err(RouteError::TooFewPoints(points.len()));
        }

        if let Some(index) = points.iter().position(|p| !p.distance.is_finite()) {
            return Err(RouteError::NonFiniteDistance { index });
        }

        if let Some(index) = points
            .windows(2)
            .position(|pair| pair[1].distance < pair[0].distance)
        {
            return Err(RouteError::NonMonotonicDistance { index: index + 1 });
        }

        smooth_grades(&mut points);

        Ok(Self {
            name: name.into(),
            points,
        })
    }

    /// Route display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All processed points
    pub fn points(&self) -> &[RoutePoint] {
        &self.points
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the route has no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total route distance in meters
    pub fn total_distance(&self) -> f64 {
        self.points.last().map(|p| p.distance).unwrap_or(0.0)
    }

    /// Elevation values in point order (for charting)
    pub fn elevation_profile(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.elevation).collect()
    }

    /// Get the interpolated point at a given ridden distance.
    ///
    /// Position and elevation are interpolated linearly between the
    /// bracketing points; grade is held at the lower point.
    pub fn point_at_distance(&self, distance: f64) -> RoutePoint {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return RoutePoint::default(),
        };

        if distance.is_nan() || distance <= first.distance {
            return first;
        }
        if distance >= last.distance {
            return last;
        }

        // First index whose distance is >= the query; always in 1..len here
        let next = self.points.partition_point(|p| p.distance < distance);
        let upper = self.points[next];
        let lower = self.points[next - 1];

        let span = upper.distance - lower.distance;
        if span <= 0.0 {
            return lower;
        }

        let ratio = (distance - lower.distance) / span;

        RoutePoint {
            latitude: lerp(lower.latitude, upper.latitude, ratio),
            longitude: lerp(lower.longitude, upper.longitude, ratio),
            elevation: lerp(lower.elevation, upper.elevation, ratio),
            distance,
            grade: lower.grade,
        }
    }
}

fn lerp(start: f64, end: f64, ratio: f64) -> f64 {
    start + ratio * (end - start)
}

/// Recompute each point's grade over a symmetric window of neighbours.
pub fn smooth_grades(points: &mut [RoutePoint]) {
    let count = points.len();
    if count < 2 {
        return;
    }

    let grades: Vec<f64> = (0..count)
        .map(|i| {
            let start = points[i.saturating_sub(GRADE_WINDOW_POINTS)];
            let end = points[(i + GRADE_WINDOW_POINTS).min(count - 1)];

            let dist_delta = end.distance - start.distance;
            if dist_delta > MIN_GRADE_WINDOW_M {
                let grade = (end.elevation - start.elevation) / dist_delta * 100.0;
                grade.clamp(-MAX_GRADE_PERCENT, MAX_GRADE_PERCENT)
            } else {
                0.0
            }
        })
        .collect();

    for (point, grade) in points.iter_mut().zip(grades) {
        point.grade = grade;
    }
}
