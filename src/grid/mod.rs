//! H3 grid primitives: cell assignment and grid distance.

mod cell;
mod metric;

pub use cell::{
    cell_of, cell_of_nullable, parse_cell, parse_resolution, CellAssignment, DEFAULT_RESOLUTION,
    UNKNOWN_CELL,
};
pub use metric::{GridMetric, H3Grid};
