//! Pipelines: chunked indexing and neighbor aggregation.

mod indexer;
mod neighbors;
mod stats;

pub use indexer::{index_file, Indexer};
pub use neighbors::NeighborPipeline;
pub use stats::{AggregateStats, IndexStats};
