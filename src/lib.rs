//! H3 Enrichment Pipelines
//!
//! Tags large lat/lon Parquet datasets with H3 cell identifiers and aggregates
//! an attribute over ring neighborhoods of those cells.
//!
//! # Architecture
//!
//! - **Grid**: cell assignment and grid distance on top of `h3o`
//! - **I/O**: chunked Parquet reading and lazily-opened chunk-append writing
//! - **Aggregate**: ring-neighbor means over an in-memory row set
//! - **Pipeline**: the indexer and neighbor pipelines with run statistics
//!
//! # Usage
//!
//! ```no_run
//! use h3_enrich::{Config, run_indexer};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml".as_ref())?;
//!     let stats = run_indexer(&config)?;
//!     println!("{}", stats);
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod config;
pub mod grid;
pub mod io;
pub mod pipeline;

pub use aggregate::{neighbor_means, ring_stats, HexRow, RingStat};
pub use config::{Config, IndexConfig, NeighborsConfig};
pub use grid::{cell_of, CellAssignment, GridMetric, H3Grid};
pub use pipeline::{index_file, AggregateStats, IndexStats, Indexer, NeighborPipeline};

use anyhow::Result;

/// Run the indexer section of `config`.
pub fn run_indexer(config: &Config) -> Result<IndexStats> {
    tracing::info!("Starting H3 indexer");
    Indexer::new(config.index.clone())?.run()
}

/// Run the neighbors section of `config`.
pub fn run_neighbors(config: &Config) -> Result<AggregateStats> {
    tracing::info!("Starting neighbor aggregation");
    NeighborPipeline::new(config.neighbors.clone())?.run()
}
