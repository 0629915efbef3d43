//! Chunked H3 indexing of a Parquet file.
//!
//! The input is streamed in `chunk_size`-row batches. Each batch gets a string
//! cell column computed from its latitude/longitude columns and is appended to
//! the output before the next batch is read, so peak memory is one chunk.
//!
//! The output writer is created from the first chunk's schema and closed
//! exactly once, also when a later chunk fails. A failed run leaves a readable
//! file holding the chunks written so far; only a successful run logs
//! `Processing complete.`.

use crate::config::IndexConfig;
use crate::grid;
use crate::io::{f64_column, with_column, ChunkReader, ChunkWriter};
use crate::pipeline::IndexStats;
use anyhow::Result;
use arrow::array::{Array, ArrayRef, StringBuilder};
use arrow::record_batch::RecordBatch;
use h3o::Resolution;
use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Streams a Parquet file through cell assignment.
pub struct Indexer {
    config: IndexConfig,
    resolution: Resolution,
}

impl Indexer {
    /// Create an indexer from a validated configuration.
    pub fn new(config: IndexConfig) -> Result<Self> {
        config.validate()?;
        let resolution = grid::parse_resolution(config.resolution)?;
        Ok(Self { config, resolution })
    }

    /// Run the indexer over the configured input.
    pub fn run(&self) -> Result<IndexStats> {
        let start = Instant::now();
        let input = self.config.input_path()?;
        let output = self.config.output_path()?;

        tracing::info!("Indexing {} -> {}", input.display(), output.display());
        let reader = ChunkReader::open(input, self.config.chunk_size)?;
        let total_rows = reader.total_rows();
        tracing::info!("Total rows: {}", total_rows);

        let mut stats = IndexStats {
            total_rows,
            ..IndexStats::default()
        };

        if !self.write_chunks(reader, output, &mut stats)? {
            tracing::warn!("Input has no rows, no output written");
        }

        stats.elapsed = start.elapsed();
        tracing::info!("Processing complete.");
        tracing::info!("{}", stats);

        if let Some(path) = &self.config.stats_output_path {
            stats.save_to_file(path)?;
        }

        Ok(stats)
    }

    /// Index every chunk into `output`, closing the writer on every path.
    ///
    /// Returns whether an output file was written. On error the chunks already
    /// written stay in a readable file.
    fn write_chunks(
        &self,
        chunks: impl IntoIterator<Item = Result<RecordBatch>>,
        output: &Path,
        stats: &mut IndexStats,
    ) -> Result<bool> {
        let mut writer = ChunkWriter::new(output);

        let outcome = self.process_chunks(chunks, &mut writer, stats);
        stats.rows_written = writer.rows_written();

        match (outcome, writer.close()) {
            (Err(e), Err(close_err)) => {
                tracing::warn!("Failed to close output after error: {:#}", close_err);
                Err(e)
            }
            (Err(e), Ok(_)) | (Ok(()), Err(e)) => Err(e),
            (Ok(()), Ok(written)) => Ok(written),
        }
    }

    /// Read, index and write every chunk in order. The source is dropped on return.
    fn process_chunks(
        &self,
        chunks: impl IntoIterator<Item = Result<RecordBatch>>,
        writer: &mut ChunkWriter,
        stats: &mut IndexStats,
    ) -> Result<()> {
        let mut offset: u64 = 0;

        for chunk in chunks {
            let chunk = chunk?;
            let (indexed, unknown) = self.index_chunk(&chunk)?;
            writer.write(&indexed)?;

            stats.chunks_written += 1;
            stats.unknown_cells += unknown;
            if unknown > 0 {
                tracing::debug!("Chunk at offset {} has {} unknown cells", offset, unknown);
            }
            tracing::info!("Processed and written chunk with offset {}", offset);

            offset += chunk.num_rows() as u64;
        }

        Ok(())
    }

    /// Attach the cell column to one chunk. Returns the chunk and its unknown count.
    pub fn index_chunk(&self, chunk: &RecordBatch) -> Result<(RecordBatch, u64)> {
        let lat = f64_column(chunk, &self.config.lat_column)?;
        let lon = f64_column(chunk, &self.config.lon_column)?;

        let rows = chunk.num_rows();
        let mut cells = StringBuilder::with_capacity(rows, rows * 16);
        let mut text = String::with_capacity(16);
        let mut unknown = 0;

        for i in 0..rows {
            let assignment = grid::cell_of_nullable(
                lat.is_valid(i).then(|| lat.value(i)),
                lon.is_valid(i).then(|| lon.value(i)),
                self.resolution,
            );
            if assignment.is_unknown() {
                unknown += 1;
            }

            text.clear();
            write!(text, "{}", assignment)?;
            cells.append_value(&text);
        }

        let cells: ArrayRef = Arc::new(cells.finish());
        let indexed = with_column(chunk, &self.config.index_column, cells, false)?;
        Ok((indexed, unknown))
    }
}

/// Index `input_path` into `output_path` with default columns and resolution.
pub fn index_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    chunk_size: usize,
) -> Result<IndexStats> {
    let config = IndexConfig {
        input_path: Some(input_path.as_ref().to_path_buf()),
        output_path: Some(output_path.as_ref().to_path_buf()),
        chunk_size,
        ..IndexConfig::default()
    };
    Indexer::new(config)?.run()
}
