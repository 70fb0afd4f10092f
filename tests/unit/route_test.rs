//! Unit tests for the distance-indexed route

use ergsim::world::import::GpsPoint;
use ergsim::world::route::{Route, RouteError, MAX_GRADE_PERCENT};

fn gps(latitude: f64, elevation: Option<f64>) -> GpsPoint {
    GpsPoint {
        latitude,
        longitude: 7.0,
        elevation,
    }
}

fn climb() -> Route {
    let raw: Vec<GpsPoint> = (0..30)
        .map(|i| gps(45.0 + i as f64 * 0.0009, Some(500.0 + i as f64 * 6.0)))
        .collect();
    Route::load("Climb", &raw).unwrap()
}

#[test]
fn test_needs_two_points() {
    assert_eq!(
        Route::load("x", &[gps(45.0, None)]).unwrap_err(),
        RouteError::TooFewPoints(1)
    );
}

#[test]
fn test_distance_is_non_decreasing() {
    let route = climb();
    assert!(route
        .points()
        .windows(2)
        .all(|pair| pair[1].distance >= pair[0].distance));
    assert_eq!(route.points()[0].distance, 0.0);
}

#[test]
fn test_lookup_is_idempotent() {
    let route = climb();
    for d in [0.0, 123.4, 1500.0, route.total_distance()] {
        assert_eq!(route.point_at_distance(d), route.point_at_distance(d));
    }
}

#[test]
fn test_lookup_clamps_to_ends() {
    let route = climb();
    let points = route.points();
    assert_eq!(route.point_at_distance(-50.0), points[0]);
    assert_eq!(
        route.point_at_distance(route.total_distance() + 1000.0),
        points[points.len() - 1]
    );
}

#[test]
fn test_lookup_interpolates_elevation() {
    let route = climb();
    let a = route.points()[3];
    let b = route.points()[4];
    let mid = route.point_at_distance((a.distance + b.distance) / 2.0);

    assert!((mid.elevation - (a.elevation + b.elevation) / 2.0).abs() < 1e-6);
    assert_eq!(mid.grade, a.grade);
}

#[test]
fn test_grades_clamped() {
    // 200 m rise over ~100 m
    let raw = vec![gps(45.0, Some(0.0)), gps(45.0009, Some(200.0)), gps(45.0018, Some(400.0))];
    let route = Route::load("Wall", &raw).unwrap();
    assert!(route
        .points()
        .iter()
        .all(|p| p.grade.abs() <= MAX_GRADE_PERCENT));
    assert_eq!(route.points()[0].grade, MAX_GRADE_PERCENT);
}

#[test]
fn test_steady_climb_grade() {
    let route = climb();
    // 6 m per ~100 m step
    let grade = route.point_at_distance(route.total_distance() / 2.0).grade;
    assert!((5.5..6.5).contains(&grade), "grade = {}", grade);
}
