//! Unit tests for session statistics and power records

use chrono::{Duration, Utc};
use ergsim::metrics::mmp::{mean_max_power, SESSION_MMP_DURATIONS};
use ergsim::session::summary::{SessionStats, SessionSummary, FREE_RIDE_NAME};

#[test]
fn test_mmp_sliding_window() {
    let mut samples = vec![150u32; 600];
    // A 30 s effort at 400 W in the middle
    for sample in samples.iter_mut().skip(200).take(30) {
        *sample = 400;
    }

    assert_eq!(mean_max_power(&samples, 1), 400);
    assert_eq!(mean_max_power(&samples, 30), 400);
    // 60 s window: 30 s at 400 + 30 s at 150
    assert_eq!(mean_max_power(&samples, 60), 275);
    assert_eq!(mean_max_power(&samples, 1200), 0);
}

#[test]
fn test_summary_records_and_fallbacks() {
    let mut stats = SessionStats::default();
    for _ in 0..400 {
        stats.record_power(250);
    }
    stats.distance = 3000.0;

    let summary = SessionSummary::build("", Utc::now() - Duration::seconds(400), &stats, 75.0);

    assert_eq!(summary.route_name, FREE_RIDE_NAME);
    assert_eq!(summary.avg_power, 250);
    assert!(summary.duration_seconds >= 400);
    assert!((summary.avg_speed_kmh - 27.0).abs() < 0.5);

    // 600 and 1200 s windows are longer than the ride
    let durations: Vec<u32> = summary.power_records.iter().map(|r| r.duration_secs).collect();
    assert_eq!(durations, SESSION_MMP_DURATIONS[..6].to_vec());
    assert!(summary
        .power_records
        .iter()
        .all(|r| (r.watts_per_kg - 250.0 / 75.0).abs() < 1e-9));
}

#[test]
fn test_summary_serializes() {
    let summary = SessionSummary::build("Loop", Utc::now(), &SessionStats::default(), 70.0);
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["route_name"], "Loop");
    assert!(json["power_records"].as_array().unwrap().is_empty());
}
