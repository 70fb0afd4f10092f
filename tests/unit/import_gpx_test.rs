//! Unit tests for GPX file parsing

use ergsim::world::import::gpx::{extract_name, parse_gpx};
use ergsim::world::import::{load_route_file, ImportError};
use std::fs;

const SAMPLE_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test">
  <metadata>
    <name>Metadata Name</name>
  </metadata>
  <trk>
    <name>Track Name</name>
    <trkseg>
      <trkpt lat="45.5" lon="-122.5">
        <ele>100</ele>
      </trkpt>
      <trkpt lat="45.501" lon="-122.5">
        <ele>110</ele>
      </trkpt>
      <trkpt lat="45.502" lon="-122.5">
        <ele>120</ele>
      </trkpt>
    </trkseg>
  </trk>
</gpx>"#;

const ROUTE_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test">
  <rte>
    <name>Route Name</name>
    <rtept lat="45.5" lon="-122.5">
      <ele>100</ele>
    </rtept>
    <rtept lat="45.51" lon="-122.51">
      <ele>110</ele>
    </rtept>
  </rte>
</gpx>"#;

const NO_ELEVATION_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test">
  <trk>
    <trkseg>
      <trkpt lat="45.5" lon="-122.5"><ele>200</ele></trkpt>
      <trkpt lat="45.501" lon="-122.5"></trkpt>
      <trkpt lat="45.502" lon="-122.5"></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

#[test]
fn test_parse_gpx_track() {
    let points = parse_gpx(SAMPLE_GPX.as_bytes()).unwrap();
    assert_eq!(points.len(), 3);
    assert!((points[0].latitude - 45.5).abs() < 0.001);
    assert!((points[0].longitude - (-122.5)).abs() < 0.001);
    assert_eq!(points[0].elevation, Some(100.0));
}

#[test]
fn test_parse_gpx_route() {
    let points = parse_gpx(ROUTE_GPX.as_bytes()).unwrap();
    assert_eq!(points.len(), 2);
    assert!((points[0].latitude - 45.5).abs() < 0.001);
    assert_eq!(points[0].elevation, Some(100.0));
}

#[test]
fn test_extract_name_track() {
    let name = extract_name(SAMPLE_GPX.as_bytes());
    assert_eq!(name, Some("Track Name".to_string()));
}

#[test]
fn test_extract_name_route() {
    let name = extract_name(ROUTE_GPX.as_bytes());
    assert_eq!(name, Some("Route Name".to_string()));
}

#[test]
fn test_parse_gpx_empty() {
    let empty = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test"></gpx>"#;
    let result = parse_gpx(empty.as_bytes());
    assert!(result.is_err());
}

#[test]
fn test_parse_gpx_invalid_xml() {
    let invalid = b"not valid xml";
    let result = parse_gpx(invalid);
    assert!(result.is_err());
}

#[test]
fn test_load_route_file_builds_route() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("climb.gpx");
    fs::write(&path, SAMPLE_GPX).unwrap();

    let route = load_route_file(&path).unwrap();
    assert_eq!(route.name(), "Track Name");
    assert_eq!(route.len(), 3);

    // ~111 m per 0.001° of latitude, plus 10 m climbs
    let total = route.total_distance();
    assert!((220.0..226.0).contains(&total), "total = {}", total);
    assert!(route.points()[0].grade > 8.0);
}

#[test]
fn test_missing_elevation_carries_previous() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flat.gpx");
    fs::write(&path, NO_ELEVATION_GPX).unwrap();

    let route = load_route_file(&path).unwrap();
    assert_eq!(route.elevation_profile(), vec![200.0, 200.0, 200.0]);
    assert!(route.points().iter().all(|p| p.grade == 0.0));
    // Unnamed GPX falls back to the file stem
    assert_eq!(route.name(), "flat");
}

#[test]
fn test_load_route_file_rejects_other_formats() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ride.fit");
    fs::write(&path, b"not a gpx").unwrap();

    assert!(matches!(
        load_route_file(&path),
        Err(ImportError::InvalidFormat(_))
    ));
}

#[test]
fn test_load_route_file_missing() {
    let result = load_route_file(std::path::Path::new("/nonexistent/route.gpx"));
    assert!(matches!(result, Err(ImportError::FileNotFound(_))));
}
