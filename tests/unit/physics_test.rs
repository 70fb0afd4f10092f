//! Unit tests for the power-to-speed solver

use ergsim::world::physics::{PhysicsEngine, MAX_SPEED_MPS};

#[test]
fn test_speed_is_monotonic_in_power() {
    let physics = PhysicsEngine::default();
    for grade in [-5.0, 0.0, 4.0, 10.0] {
        let mut previous = 0.0;
        for power in (0..=600).step_by(50) {
            let speed = physics.calculate_speed(power as f64, grade);
            assert!(
                speed + 0.02 >= previous,
                "speed dropped at {} W on {}%",
                power,
                grade
            );
            previous = speed;
        }
    }
}

#[test]
fn test_speed_never_negative_or_above_cap() {
    let physics = PhysicsEngine::default();
    for grade in [-25.0, -10.0, 0.0, 10.0, 25.0] {
        for power in [-200.0, 0.0, 150.0, 2000.0] {
            let speed = physics.calculate_speed(power, grade);
            assert!(speed >= 0.0);
            assert!(speed <= MAX_SPEED_MPS);
        }
    }
}

#[test]
fn test_descent_moves_without_pedalling() {
    let physics = PhysicsEngine::default();
    assert_eq!(physics.calculate_speed(0.0, 0.0), 0.0);
    assert!(physics.calculate_speed(0.0, -6.0) > 5.0);
}

#[test]
fn test_typical_flat_speed() {
    // 200 W on the flat is roughly 30-34 km/h for a 84 kg system
    let physics = PhysicsEngine::new(75.0, 9.0);
    let kmh = physics.calculate_speed(200.0, 0.0) * 3.6;
    assert!((28.0..36.0).contains(&kmh), "got {} km/h", kmh);
}

#[test]
fn test_mass_matters_uphill() {
    let light = PhysicsEngine::new(60.0, 7.0);
    let heavy = PhysicsEngine::new(95.0, 10.0);
    assert!(light.calculate_speed(250.0, 8.0) > heavy.calculate_speed(250.0, 8.0));
}
