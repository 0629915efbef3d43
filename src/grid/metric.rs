//! Grid distance between cells.

use h3o::CellIndex;
use std::hash::Hash;

/// Step distance between cells of a discrete grid.
pub trait GridMetric {
    /// Cell identifier type.
    type Cell: Eq + Hash;

    /// Number of cell-to-cell steps from `from` to `to`.
    ///
    /// `None` when the distance is undefined for this pair.
    fn grid_distance(&self, from: &Self::Cell, to: &Self::Cell) -> Option<u32>;
}

/// H3 grid metric backed by `h3o`.
///
/// Distances are undefined across resolutions, across pentagon distortion,
/// and for cells too far apart for local IJ coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct H3Grid;

impl GridMetric for H3Grid {
    type Cell = CellIndex;

    fn grid_distance(&self, from: &CellIndex, to: &CellIndex) -> Option<u32> {
        from.grid_distance(*to)
            .ok()
            .and_then(|d| u32::try_from(d).ok())
    }
}
