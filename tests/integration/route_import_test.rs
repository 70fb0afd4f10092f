//! GPX file to ride: import, grade smoothing and SIM control

use std::fs;
use std::time::Duration;

use ergsim::sensors::{ControlCommand, MockTrainer, TrainerMode};
use ergsim::session::{Session, SessionEvent};
use ergsim::storage::config::AppConfig;
use ergsim::world::import::load_route_file;

/// A steady climb: ~111 m per point, 5 m of elevation gain each
fn climb_gpx(points: usize) -> String {
    let mut gpx = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test">
  <trk>
    <name>Test Climb</name>
    <trkseg>
"#,
    );
    for i in 0..points {
        gpx.push_str(&format!(
            "      <trkpt lat=\"{:.4}\" lon=\"7.0\"><ele>{:.1}</ele></trkpt>\n",
            45.0 + i as f64 * 0.001,
            500.0 + i as f64 * 5.0
        ));
    }
    gpx.push_str("    </trkseg>\n  </trk>\n</gpx>\n");
    gpx
}

#[test]
fn test_imported_climb_grade() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("climb.gpx");
    fs::write(&path, climb_gpx(20)).unwrap();

    let route = load_route_file(&path).unwrap();
    assert_eq!(route.name(), "Test Climb");
    assert_eq!(route.len(), 20);
    // 19 segments of ~111 m
    assert!((route.total_distance() - 19.0 * 111.3).abs() < 20.0);

    for point in route.points() {
        assert!(point.grade > 4.0 && point.grade < 5.0, "grade {}", point.grade);
    }

    let middle = route.point_at_distance(route.total_distance() / 2.0);
    assert!((middle.elevation - 547.5).abs() < 1.0);
}

#[tokio::test(start_paused = true)]
async fn test_ride_imported_route_in_sim() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("climb.gpx");
    fs::write(&path, climb_gpx(20)).unwrap();
    let route = load_route_file(&path).unwrap();

    let mut session = Session::new(MockTrainer::default(), &AppConfig::default());
    let events = session.take_events().unwrap();
    session.load_route(route).unwrap();
    session.connect_trainer().await.unwrap();
    session.start().await.unwrap();

    tokio::time::sleep(Duration::from_secs(20)).await;

    assert_eq!(session.control().mode(), TrainerMode::Sim);
    let grade = session.control().target_grade();
    assert!(grade > 4.0 && grade < 5.0, "target grade {}", grade);
    assert!(matches!(
        session.control().last_sent(),
        Some(ControlCommand::TrackResistance(_))
    ));

    let snapshots: Vec<_> = events
        .try_iter()
        .filter_map(|e| match e {
            SessionEvent::Telemetry(t) => Some(t),
            _ => None,
        })
        .collect();
    let last = snapshots.last().unwrap();
    assert!(last.altitude > 500.0);
    assert!(last.grade > 4.0);
    // Slower uphill than on the flat at the same power
    assert!(last.speed_kmh > 5.0 && last.speed_kmh < 25.0, "speed {}", last.speed_kmh);

    let summary = session.finish().await.unwrap();
    assert_eq!(summary.route_name, "Test Climb");
    assert!(summary.distance > 50.0);
}
