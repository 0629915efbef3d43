//! Run statistics for the indexing and neighbor pipelines.

use serde::{Serialize, Serializer};
use std::path::Path;
use std::time::Duration;

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Save any statistics value as pretty JSON.
fn save_json<T: Serialize>(value: &T, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    tracing::info!("Statistics saved to {}", path.display());
    Ok(())
}

/// Statistics of a completed indexing run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    /// Row count from the input footer
    pub total_rows: u64,

    /// Rows written to the output
    pub rows_written: u64,

    /// Chunks written to the output
    pub chunks_written: u64,

    /// Rows whose coordinates could not be assigned a cell
    pub unknown_cells: u64,

    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
}

impl IndexStats {
    /// Rows per second over the whole run.
    pub fn rows_per_second(&self) -> f64 {
        let elapsed = self.elapsed.as_secs_f64();
        if elapsed > 0.0 {
            self.rows_written as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Save statistics to a JSON file.
    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        save_json(self, path)
    }
}

impl std::fmt::Display for IndexStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unknown_pct = if self.rows_written > 0 {
            self.unknown_cells as f64 / self.rows_written as f64 * 100.0
        } else {
            0.0
        };

        write!(
            f,
            "Rows: {}/{} written in {} chunks | Unknown cells: {} ({:.1}%) | \
             Rate: {:.0} rows/s | Elapsed: {:.1}s",
            self.rows_written,
            self.total_rows,
            self.chunks_written,
            self.unknown_cells,
            unknown_pct,
            self.rows_per_second(),
            self.elapsed.as_secs_f64(),
        )
    }
}

/// Statistics of a completed neighbor aggregation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateStats {
    /// Rows in the input table
    pub rows: u64,

    /// Distinct decodable cells
    pub distinct_cells: u64,

    /// Rows with a missing or undecodable cell identifier
    pub rows_without_cell: u64,

    /// Ring distances aggregated
    pub distances: Vec<u32>,

    /// Per distance, rows whose ring held no neighbors
    pub empty_rings: Vec<u64>,

    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
}

impl AggregateStats {
    /// Save statistics to a JSON file.
    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        save_json(self, path)
    }
}

impl std::fmt::Display for AggregateStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rings: Vec<String> = self
            .distances
            .iter()
            .zip(&self.empty_rings)
            .map(|(d, empty)| format!("d{}: {} empty", d, empty))
            .collect();

        write!(
            f,
            "Rows: {} | Cells: {} distinct, {} missing | Rings: [{}] | Elapsed: {:.1}s",
            self.rows,
            self.distinct_cells,
            self.rows_without_cell,
            rings.join(", "),
            self.elapsed.as_secs_f64(),
        )
    }
}
