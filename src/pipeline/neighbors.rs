//! Ring-neighbor aggregation over a Parquet table of hex rows.
//!
//! The whole table is held in memory for the duration of the run. One nullable
//! Float64 column per configured distance is appended; rings without neighbors
//! are written as null.

use crate::aggregate::{ring_stats, HexRow, RingStat};
use crate::config::NeighborsConfig;
use crate::grid::{self, H3Grid};
use crate::io::{f64_column, read_table, utf8_column, with_column, ChunkWriter};
use crate::pipeline::AggregateStats;
use anyhow::Result;
use arrow::array::{Array, ArrayRef, Float64Array};
use arrow::record_batch::RecordBatch;
use h3o::CellIndex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Loads hex rows, aggregates neighbor means, writes the augmented table.
pub struct NeighborPipeline {
    config: NeighborsConfig,
}

impl NeighborPipeline {
    pub fn new(config: NeighborsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn run(&self) -> Result<AggregateStats> {
        let start = Instant::now();
        let input = self.config.input_path()?;
        let output = self.config.output_path()?;

        tracing::info!("Loading hex rows from {}", input.display());
        let batches = read_table(input)?;
        let rows = self.load_rows(&batches)?;
        tracing::info!("Loaded {} rows", rows.len());

        let stats = ring_stats(&H3Grid, &rows, &self.config.distances);

        let mut writer = ChunkWriter::new(output);
        let outcome = self.write_batches(&batches, &stats, &mut writer);
        match (outcome, writer.close()) {
            (Err(e), Err(close_err)) => {
                tracing::warn!("Failed to close output after error: {:#}", close_err);
                return Err(e);
            }
            (Err(e), Ok(_)) | (Ok(()), Err(e)) => return Err(e),
            (Ok(()), Ok(false)) => tracing::warn!("Input has no rows, no output written"),
            (Ok(()), Ok(true)) => {}
        }

        let summary = self.summarize(&rows, &stats, start);
        tracing::info!("Processing complete.");
        tracing::info!("{}", summary);

        if let Some(path) = &self.config.stats_output_path {
            summary.save_to_file(path)?;
        }

        Ok(summary)
    }

    /// Decode the cell and attribute columns of every batch.
    fn load_rows(&self, batches: &[RecordBatch]) -> Result<Vec<HexRow<CellIndex>>> {
        let mut rows = Vec::with_capacity(batches.iter().map(|b| b.num_rows()).sum());

        for batch in batches {
            let cells = utf8_column(batch, &self.config.cell_column)?;
            let values = f64_column(batch, &self.config.attribute)?;

            for i in 0..batch.num_rows() {
                rows.push(HexRow {
                    cell: cells
                        .is_valid(i)
                        .then(|| grid::parse_cell(cells.value(i)))
                        .flatten(),
                    value: values.is_valid(i).then(|| values.value(i)),
                });
            }
        }

        Ok(rows)
    }

    /// Append the mean columns batch by batch, slicing the per-row results.
    fn write_batches(
        &self,
        batches: &[RecordBatch],
        stats: &[Vec<RingStat>],
        writer: &mut ChunkWriter,
    ) -> Result<()> {
        let mut offset = 0;

        for batch in batches {
            let rows = &stats[offset..offset + batch.num_rows()];
            let mut augmented = batch.clone();

            for (slot, &d) in self.config.distances.iter().enumerate() {
                let means: Float64Array = rows.iter().map(|row| row[slot].mean()).collect();
                let means: ArrayRef = Arc::new(means);
                augmented = with_column(&augmented, &self.config.mean_column(d), means, true)?;
            }

            writer.write(&augmented)?;
            offset += batch.num_rows();
        }

        Ok(())
    }

    fn summarize(
        &self,
        rows: &[HexRow<CellIndex>],
        stats: &[Vec<RingStat>],
        start: Instant,
    ) -> AggregateStats {
        let distinct: HashSet<&CellIndex> = rows.iter().filter_map(|r| r.cell.as_ref()).collect();
        let empty_rings = (0..self.config.distances.len())
            .map(|slot| stats.iter().filter(|row| row[slot].neighbors == 0).count() as u64)
            .collect();

        AggregateStats {
            rows: rows.len() as u64,
            distinct_cells: distinct.len() as u64,
            rows_without_cell: rows.iter().filter(|r| r.cell.is_none()).count() as u64,
            distances: self.config.distances.clone(),
            empty_rings,
            elapsed: start.elapsed(),
        }
    }
}
