//! Neighborhood aggregation over grid cells.

mod neighbors;

pub use neighbors::{
    neighbor_means, ring_stats, HexRow, RingStat, DEFAULT_ATTRIBUTE, DEFAULT_DISTANCES,
};
