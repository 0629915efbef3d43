//! Cell assignment: (lat, lon, resolution) → H3 cell.
//!
//! Assignment fails closed. Any coordinate that cannot be converted
//! (non-finite, out of range, null) maps to [`CellAssignment::Unknown`]
//! instead of an error, so a single bad row never aborts an indexing run.

use anyhow::{Context, Result};
use h3o::{CellIndex, LatLng, Resolution};
use std::fmt;

/// Text written to the index column for rows without a cell.
pub const UNKNOWN_CELL: &str = "unknown";

/// Default H3 resolution (~0.74 km² hexagons).
pub const DEFAULT_RESOLUTION: u8 = 8;

/// Outcome of assigning a coordinate to a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellAssignment {
    /// The coordinate falls in this cell.
    Cell(CellIndex),

    /// The coordinate could not be converted.
    Unknown,
}

impl CellAssignment {
    /// Get the cell, if one was assigned.
    pub fn cell(&self) -> Option<CellIndex> {
        match self {
            Self::Cell(cell) => Some(*cell),
            Self::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl From<Option<CellIndex>> for CellAssignment {
    fn from(cell: Option<CellIndex>) -> Self {
        cell.map_or(Self::Unknown, Self::Cell)
    }
}

impl fmt::Display for CellAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cell(cell) => write!(f, "{}", cell),
            Self::Unknown => f.write_str(UNKNOWN_CELL),
        }
    }
}

/// Assign a WGS84 coordinate (degrees) to its cell at `resolution`.
pub fn cell_of(lat: f64, lon: f64, resolution: Resolution) -> CellAssignment {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        // Also rejects NaN: range checks are false for NaN.
        return CellAssignment::Unknown;
    }

    LatLng::new(lat, lon)
        .ok()
        .map(|ll| ll.to_cell(resolution))
        .into()
}

/// Like [`cell_of`], with null coordinates mapping to `Unknown`.
pub fn cell_of_nullable(
    lat: Option<f64>,
    lon: Option<f64>,
    resolution: Resolution,
) -> CellAssignment {
    match (lat, lon) {
        (Some(lat), Some(lon)) => cell_of(lat, lon, resolution),
        _ => CellAssignment::Unknown,
    }
}

/// Validate an integer resolution level (0-15).
pub fn parse_resolution(level: u8) -> Result<Resolution> {
    Resolution::try_from(level)
        .with_context(|| format!("Invalid H3 resolution {} (expected 0-15)", level))
}

/// Decode a hex cell identifier. The unknown marker and malformed text yield `None`.
pub fn parse_cell(text: &str) -> Option<CellIndex> {
    let text = text.trim();
    if text.is_empty() || text == UNKNOWN_CELL {
        return None;
    }
    text.parse::<CellIndex>().ok()
}
