//! Unit tests for workout execution

use ergsim::workouts::engine::WorkoutEngine;
use ergsim::workouts::plan::WorkoutStep;
use ergsim::workouts::types::ActiveWorkout;

fn pyramid() -> ActiveWorkout {
    ActiveWorkout::from_steps(
        "Pyramid",
        &[
            WorkoutStep::Warmup {
                duration: 300,
                power_low: 0.4,
                power_high: 0.7,
            },
            WorkoutStep::SteadyState {
                duration: 240,
                power: 1.05,
            },
            WorkoutStep::Cooldown {
                duration: 180,
                power_low: 0.7,
                power_high: 0.4,
            },
        ],
    )
    .unwrap()
}

#[test]
fn test_total_is_sum_of_segments() {
    let workout = pyramid();
    let sum: u32 = workout.segments().iter().map(|s| s.duration_seconds).sum();
    assert_eq!(workout.total_duration(), sum);
}

#[test]
fn test_every_second_resolves_to_one_segment() {
    let workout = pyramid();
    let mut previous_index = 0;
    for second in 0..workout.total_duration() {
        let position = workout
            .segment_at(second as f64)
            .unwrap_or_else(|| panic!("no segment at {}s", second));
        assert!(position.index >= previous_index);
        previous_index = position.index;
    }
    assert!(workout.segment_at(workout.total_duration() as f64).is_none());
}

#[test]
fn test_ramp_targets() {
    let mut engine = WorkoutEngine::new(pyramid());

    // Halfway through the warmup: 0.55 × 250 W
    engine.advance(150.0);
    let target = engine.target_watts(250, 1.0).unwrap();
    assert!((target - 137.5).abs() < 1e-6);

    // Steady block at 90% intensity
    engine.advance(200.0);
    let target = engine.target_watts(250, 0.9).unwrap();
    assert!((target - 1.05 * 250.0 * 0.9).abs() < 1e-6);
}

#[test]
fn test_finishes_after_total() {
    let mut engine = WorkoutEngine::new(pyramid());
    engine.advance(719.0);
    assert!(!engine.is_finished());
    assert!(engine.target_watts(200, 1.0).is_some());

    engine.advance(2.0);
    assert!(engine.is_finished());
    assert!(engine.target_watts(200, 1.0).is_none());
    assert!(engine.snapshot(200, 1.0).is_none());
    assert_eq!(engine.completion_percent(), 100.0);
}

#[test]
fn test_snapshot_fields() {
    let mut engine = WorkoutEngine::new(pyramid());
    engine.advance(290.0);

    let snapshot = engine.snapshot(200, 1.1).unwrap();
    assert_eq!(snapshot.workout_name, "Pyramid");
    assert_eq!(snapshot.segment_index, 0);
    assert_eq!(snapshot.segment_remaining_seconds, 10);
    // Next target is the steady block at nominal intensity
    assert_eq!(snapshot.next_target_power, 210);
    assert_eq!(snapshot.intensity_percent, 110);
    assert!((snapshot.completion_percent - 290.0 / 720.0 * 100.0).abs() < 1e-9);
}
