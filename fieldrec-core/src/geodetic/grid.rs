//! Grid reference capability and its geohash implementation.
//!
//! Geohash references are lowercase base32, so they never collide with
//! Ordnance Survey references.

use geohash::Coord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest geohash the grid accepts.
pub const MAX_GEOHASH_PRECISION: usize = 12;

/// Errors from grid reference math.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GridError {
    #[error("Invalid grid reference: {0}")]
    InvalidReference(String),

    #[error("Unsupported precision: {0}")]
    InvalidPrecision(usize),

    #[error("Coordinate out of range: {lat}, {lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },
}

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Cell-based location encoding at selectable precision.
///
/// Higher precision means a smaller cell.
pub trait GridSystem: Send + Sync {
    /// Reference of the cell containing a coordinate.
    fn reference_at(&self, lat: f64, lon: f64, precision: usize) -> Result<String, GridError>;

    /// Precision level implied by a reference.
    fn precision_of(&self, reference: &str) -> Result<usize, GridError>;

    /// Geometric center of a reference's cell.
    fn centroid_of(&self, reference: &str) -> Result<LatLon, GridError>;

    /// Corners of a reference's cell, not closed.
    fn cell_polygon(&self, reference: &str) -> Result<Vec<LatLon>, GridError>;

    /// Precision levels offered for display.
    fn precisions(&self) -> Vec<usize>;

    /// Whether a reference is written in this grid.
    fn recognizes(&self, reference: &str) -> bool {
        self.precision_of(reference).is_ok()
    }

    fn name(&self) -> &'static str;
}

/// Geohash grid: precision is the number of base32 characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeohashGrid;

impl GeohashGrid {
    fn check_precision(precision: usize) -> Result<(), GridError> {
        if (1..=MAX_GEOHASH_PRECISION).contains(&precision) {
            Ok(())
        } else {
            Err(GridError::InvalidPrecision(precision))
        }
    }

    fn bbox(reference: &str) -> Result<geohash::Rect<f64>, GridError> {
        Self::check_precision(reference.len())
            .map_err(|_| GridError::InvalidReference(reference.to_string()))?;
        geohash::decode_bbox(reference)
            .map_err(|e| GridError::InvalidReference(format!("{reference}: {e}")))
    }
}

impl GridSystem for GeohashGrid {
    fn reference_at(&self, lat: f64, lon: f64, precision: usize) -> Result<String, GridError> {
        Self::check_precision(precision)?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(GridError::InvalidCoordinate { lat, lon });
        }
        geohash::encode(Coord { x: lon, y: lat }, precision)
            .map_err(|_| GridError::InvalidCoordinate { lat, lon })
    }

    fn precision_of(&self, reference: &str) -> Result<usize, GridError> {
        Self::bbox(reference)?;
        Ok(reference.len())
    }

    fn centroid_of(&self, reference: &str) -> Result<LatLon, GridError> {
        let rect = Self::bbox(reference)?;
        Ok(LatLon::new(
            (rect.min().y + rect.max().y) / 2.0,
            (rect.min().x + rect.max().x) / 2.0,
        ))
    }

    fn cell_polygon(&self, reference: &str) -> Result<Vec<LatLon>, GridError> {
        let rect = Self::bbox(reference)?;
        let (min, max) = (rect.min(), rect.max());
        Ok(vec![
            LatLon::new(min.y, min.x),
            LatLon::new(max.y, min.x),
            LatLon::new(max.y, max.x),
            LatLon::new(min.y, max.x),
        ])
    }

    fn precisions(&self) -> Vec<usize> {
        (1..=MAX_GEOHASH_PRECISION).collect()
    }

    fn name(&self) -> &'static str {
        "geohash"
    }
}
