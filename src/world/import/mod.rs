//! Route import from GPS files.
//!
//! Parsers yield raw [`GpsPoint`]s; [`load_route_file`] turns a file on disk
//! into a ready-to-ride [`Route`].

pub mod gpx;

use crate::world::route::{Route, RouteError};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Earth radius used for great-circle distances
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Largest route file accepted
pub const MAX_FILE_SIZE_MB: f64 = 50.0;

/// A raw GPS point as read from a file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Elevation in meters, if the file carries one
    pub elevation: Option<f64>,
}

/// Errors that can occur during route import
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("File too large: {size_mb:.1}MB exceeds maximum {max_mb:.1}MB")]
    TooLarge { size_mb: f64, max_mb: f64 },

    #[error("Invalid route: {0}")]
    Route(#[from] RouteError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Read a route file from disk and build a [`Route`].
///
/// The route is named after the file's track/route name, falling back to the
/// file stem.
pub fn load_route_file(path: &Path) -> Result<Route, ImportError> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    if extension.as_deref() != Some("gpx") {
        return Err(ImportError::InvalidFormat(format!(
            "Unsupported route file: {}",
            path.display()
        )));
    }

    let size_mb = std::fs::metadata(path)?.len() as f64 / (1024.0 * 1024.0);
    if size_mb > MAX_FILE_SIZE_MB {
        return Err(ImportError::TooLarge {
            size_mb,
            max_mb: MAX_FILE_SIZE_MB,
        });
    }

    let content = std::fs::read(path)?;
    let gpx::GpxRoute { name, points } = gpx::read_gpx(&content)?;
    let name = name.unwrap_or_else(|| {
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Route")
            .to_string()
    });

    tracing::info!("Importing route '{}' from {}", name, path.display());
    Ok(Route::load(name, &points)?)
}

/// Great-circle distance between two coordinates, in meters
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Distance between two points including the elevation change
pub fn distance_3d(from: &GpsPoint, to: &GpsPoint, from_elevation: f64, to_elevation: f64) -> f64 {
    let horizontal = haversine_distance(from.latitude, from.longitude, to.latitude, to.longitude);
    let vertical = to_elevation - from_elevation;
    (horizontal * horizontal + vertical * vertical).sqrt()
}
