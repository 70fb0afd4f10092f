//! GPX parser for route import.

use super::{GpsPoint, ImportError};

fn to_gps_point(waypoint: &gpx::Waypoint) -> GpsPoint {
    let point = waypoint.point();
    GpsPoint {
        latitude: point.y(),
        longitude: point.x(),
        elevation: waypoint.elevation,
    }
}

/// Points and name read from one GPX document
#[derive(Debug, Clone, PartialEq)]
pub struct GpxRoute {
    pub name: Option<String>,
    pub points: Vec<GpsPoint>,
}

/// Parse GPX content once, keeping both the points and the name.
///
/// Track points are used when present, otherwise route points.
pub fn read_gpx(content: &[u8]) -> Result<GpxRoute, ImportError> {
    let gpx_data: gpx::Gpx =
        gpx::read(content).map_err(|e| ImportError::ParseError(format!("GPX parse error: {}", e)))?;

    let points = collect_points(&gpx_data);
    if points.len() < 2 {
        return Err(ImportError::ParseError(
            "GPX file does not contain enough GPS points".to_string(),
        ));
    }

    tracing::debug!("Parsed {} GPX points", points.len());
    Ok(GpxRoute {
        name: route_name(&gpx_data),
        points,
    })
}

/// Parse GPX content into GPS points.
pub fn parse_gpx(content: &[u8]) -> Result<Vec<GpsPoint>, ImportError> {
    read_gpx(content).map(|route| route.points)
}

/// Extract the route name from GPX content
pub fn extract_name(content: &[u8]) -> Option<String> {
    gpx::read(content).ok().and_then(|gpx_data| route_name(&gpx_data))
}

fn collect_points(gpx_data: &gpx::Gpx) -> Vec<GpsPoint> {
    let points: Vec<GpsPoint> = gpx_data
        .tracks
        .iter()
        .flat_map(|track| track.segments.iter())
        .flat_map(|segment| segment.points.iter())
        .map(to_gps_point)
        .collect();

    if !points.is_empty() {
        return points;
    }
    gpx_data
        .routes
        .iter()
        .flat_map(|route| route.points.iter())
        .map(to_gps_point)
        .collect()
}

fn route_name(gpx_data: &gpx::Gpx) -> Option<String> {
    gpx_data
        .tracks
        .iter()
        .find_map(|t| t.name.clone())
        .or_else(|| gpx_data.routes.iter().find_map(|r| r.name.clone()))
        .or_else(|| gpx_data.metadata.as_ref().and_then(|m| m.name.clone()))
}
