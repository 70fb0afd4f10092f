//! Unit tests for workout step flattening

use ergsim::workouts::plan::{flatten_steps, load_workout_file, WorkoutPlan, WorkoutStep};
use ergsim::workouts::types::{ActiveWorkout, SegmentKind, WorkoutError};

const PLAN_JSON: &str = r#"{
  "name": "Sweet Spot 3x10",
  "steps": [
    { "type": "Warmup", "duration": 600, "power_low": 0.45, "power_high": 0.75 },
    { "type": "Intervals", "repeat": 3, "on_duration": 600, "off_duration": 300,
      "on_power": 0.9, "off_power": 0.55 },
    { "type": "FreeRide", "duration": 120 },
    { "type": "Cooldown", "duration": 300, "power_low": 0.6, "power_high": 0.4 }
  ]
}"#;

#[test]
fn test_three_by_thirty_fifteen() {
    let workout = ActiveWorkout::from_steps(
        "30/15",
        &[WorkoutStep::Intervals {
            repeat: 3,
            on_duration: 30,
            off_duration: 15,
            on_power: 1.2,
            off_power: 0.5,
        }],
    )
    .unwrap();

    assert_eq!(workout.segments().len(), 6);
    assert_eq!(workout.total_duration(), 135);
    let kinds: Vec<SegmentKind> = workout.segments().iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![
            SegmentKind::IntervalOn,
            SegmentKind::IntervalOff,
            SegmentKind::IntervalOn,
            SegmentKind::IntervalOff,
            SegmentKind::IntervalOn,
            SegmentKind::IntervalOff,
        ]
    );
}

#[test]
fn test_segments_are_indexed_in_order() {
    let segments = flatten_steps(&[
        WorkoutStep::SteadyState {
            duration: 60,
            power: 0.6,
        },
        WorkoutStep::Ramp {
            duration: 120,
            power_low: 0.6,
            power_high: 1.0,
        },
    ]);
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[1].index, 1);
    assert_eq!(segments[1].kind, SegmentKind::Ramp);
    assert_eq!(segments[1].end_factor, 1.0);
}

#[test]
fn test_parse_full_plan() {
    let workout = WorkoutPlan::from_json(PLAN_JSON)
        .unwrap()
        .into_workout()
        .unwrap();

    assert_eq!(workout.name, "Sweet Spot 3x10");
    // warmup + 6 interval segments + free ride + cooldown
    assert_eq!(workout.segments().len(), 9);
    assert_eq!(workout.total_duration(), 600 + 3 * 900 + 120 + 300);

    let free_ride = &workout.segments()[7];
    assert_eq!(free_ride.kind, SegmentKind::Steady);
    assert_eq!(free_ride.start_factor, 0.0);
}

#[test]
fn test_empty_plan_rejected() {
    let result = WorkoutPlan::from_json(r#"{ "name": "Nothing", "steps": [] }"#)
        .unwrap()
        .into_workout();
    assert!(matches!(result, Err(WorkoutError::Empty)));
}

#[test]
fn test_load_workout_file_errors() {
    let dir = tempfile::tempdir().unwrap();

    assert!(matches!(
        load_workout_file(&dir.path().join("missing.json")),
        Err(WorkoutError::FileReadError(_))
    ));

    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, "{ not json").unwrap();
    assert!(matches!(
        load_workout_file(&bad),
        Err(WorkoutError::ParseError(_))
    ));

    let good = dir.path().join("good.json");
    std::fs::write(&good, PLAN_JSON).unwrap();
    assert_eq!(load_workout_file(&good).unwrap().segments().len(), 9);
}
