//! Geodetic precision reconciliation.
//!
//! A record's stored grid reference is either still the one derived from the
//! capture fix, or it has been overridden by hand. When the display precision
//! changes, the reference is recomputed from:
//!
//! - the original fix, if recomputing it at the stored precision reproduces the
//!   stored reference exactly (no precision is lost when zooming in);
//! - otherwise the centroid of the stored cell (the override is respected).
//!
//! Consistency is exact string equality, never proximity.
//!
//! Each reference is handled by the grid it is written in: an Ordnance Survey
//! reference is recomputed on the National Grid even when new references are
//! geohashes, and the other way round.

mod grid;
mod osgrid;

pub use grid::{GeohashGrid, GridError, GridSystem, LatLon, MAX_GEOHASH_PRECISION};
pub use osgrid::{OsGrid, OS_GRID_PRECISIONS};

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::filename::{CaptureDetails, CaptureLocation};
use crate::schema::fields;
use crate::store::RecordStore;

/// Grid used for newly derived references.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeorefFormat {
    /// Geohash; precision is the number of characters.
    #[default]
    Geohash,
    /// Ordnance Survey National Grid; precision is the cell size in metres.
    Osgr,
}

impl GeorefFormat {
    pub fn grid(self) -> Arc<dyn GridSystem> {
        match self {
            Self::Geohash => Arc::new(GeohashGrid),
            Self::Osgr => Arc::new(OsGrid),
        }
    }

    pub fn default_precision(self) -> usize {
        match self {
            Self::Geohash => 6,
            Self::Osgr => 100,
        }
    }

    pub fn accepts_precision(self, precision: usize) -> bool {
        self.grid().precisions().contains(&precision)
    }
}

impl FromStr for GeorefFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "geohash" => Ok(Self::Geohash),
            "osgr" | "os" | "osgb" => Ok(Self::Osgr),
            other => Err(format!("unknown grid format: {other} (expected geohash or osgr)")),
        }
    }
}

/// Which coordinate the new reference was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "basis", rename_all = "snake_case")]
pub enum CoordinateBasis {
    /// The capture fix recovered from the record's base name.
    OriginalFix(LatLon),
    /// The centre of the stored reference's cell.
    StoredCentroid(LatLon),
}

impl CoordinateBasis {
    pub fn coordinate(&self) -> LatLon {
        match self {
            Self::OriginalFix(c) | Self::StoredCentroid(c) => *c,
        }
    }
}

/// Outcome of recomputing a reference at a new precision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    pub reference: String,
    pub polygon: Vec<LatLon>,
    pub basis: CoordinateBasis,
    /// Whether the stored reference still matched the capture fix.
    pub consistent: bool,
    pub stored_precision: usize,
    pub requested_precision: usize,
}

/// Recomputes location references against one or more grid systems.
///
/// The first grid is used for references computed from a bare coordinate.
#[derive(Clone)]
pub struct PrecisionReconciler {
    grids: Vec<Arc<dyn GridSystem>>,
}

impl PrecisionReconciler {
    pub fn new(grid: Arc<dyn GridSystem>) -> Self {
        Self { grids: vec![grid] }
    }

    /// Reconciler for `format`, still able to read references in the other grid.
    pub fn for_format(format: GeorefFormat) -> Self {
        let other = match format {
            GeorefFormat::Geohash => GeorefFormat::Osgr,
            GeorefFormat::Osgr => GeorefFormat::Geohash,
        };
        Self::new(format.grid()).with_grid(other.grid())
    }

    /// Also accept references written in `grid`.
    pub fn with_grid(mut self, grid: Arc<dyn GridSystem>) -> Self {
        self.grids.push(grid);
        self
    }

    pub fn grid(&self) -> &Arc<dyn GridSystem> {
        &self.grids[0]
    }

    /// Grid a reference is written in.
    pub fn grid_for(&self, reference: &str) -> std::result::Result<&Arc<dyn GridSystem>, GridError> {
        self.grids
            .iter()
            .find(|grid| grid.recognizes(reference))
            .ok_or_else(|| GridError::InvalidReference(reference.to_string()))
    }

    /// Capture fix encoded in a base name.
    ///
    /// Grid-form names carry no coordinate, so the centre of their cell
    /// stands in for the fix.
    pub fn original_fix(&self, details: &CaptureDetails) -> Result<LatLon> {
        match &details.location {
            CaptureLocation::LatLon {
                latitude,
                longitude,
            } => Ok(LatLon::new(*latitude, *longitude)),
            CaptureLocation::GridRef(gr) => Ok(self.grid_for(gr)?.centroid_of(gr)?),
        }
    }

    /// Recompute `stored` at `requested_precision` for the record `base_name`.
    #[instrument(level = "debug", skip(self))]
    pub fn reconcile(
        &self,
        base_name: &str,
        stored: &str,
        requested_precision: usize,
    ) -> Result<Reconciliation> {
        let details = CaptureDetails::parse(base_name)?;
        let fix = self.original_fix(&details)?;

        let grid = self.grid_for(stored)?;
        let stored_precision = grid.precision_of(stored)?;
        // A fix outside the stored grid's coverage cannot reproduce the reference
        let consistent = grid
            .reference_at(fix.lat, fix.lon, stored_precision)
            .is_ok_and(|recomputed| recomputed == stored);

        let basis = if consistent {
            CoordinateBasis::OriginalFix(fix)
        } else {
            CoordinateBasis::StoredCentroid(grid.centroid_of(stored)?)
        };
        debug!(grid = grid.name(), consistent, stored_precision, ?basis, "Chose coordinate basis");

        let coordinate = basis.coordinate();
        let reference = grid.reference_at(coordinate.lat, coordinate.lon, requested_precision)?;
        let polygon = grid.cell_polygon(&reference)?;

        Ok(Reconciliation {
            reference,
            polygon,
            basis,
            consistent,
            stored_precision,
            requested_precision,
        })
    }

    /// Reconcile the grid reference stored in a record's metadata document.
    ///
    /// Returns `None` when the record has no stored reference.
    pub async fn reconcile_record(
        &self,
        store: &RecordStore,
        base_name: &str,
        requested_precision: usize,
    ) -> Result<Option<Reconciliation>> {
        let doc = store.get_or_create_metadata(base_name).await?;
        let stored = doc.get_str(fields::GRIDREF).unwrap_or_default();
        if stored.trim().is_empty() {
            debug!(base_name, "No stored grid reference");
            return Ok(None);
        }
        self.reconcile(base_name, stored.trim(), requested_precision)
            .map(Some)
    }

    /// Reference and cell polygon for an arbitrary coordinate.
    pub fn reference_for_point(
        &self,
        lat: f64,
        lon: f64,
        precision: usize,
    ) -> Result<(String, Vec<LatLon>)> {
        let grid = self.grid();
        let reference = grid.reference_at(lat, lon, precision)?;
        let polygon = grid.cell_polygon(&reference)?;
        Ok((reference, polygon))
    }
}

impl Default for PrecisionReconciler {
    fn default() -> Self {
        Self::for_format(GeorefFormat::default())
    }
}

impl std::fmt::Debug for PrecisionReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.grids.iter().map(|grid| grid.name()).collect();
        f.debug_struct("PrecisionReconciler")
            .field("grids", &names)
            .finish()
    }
}
