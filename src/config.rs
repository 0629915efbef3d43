//! Configuration for the indexing and neighbor pipelines.

use crate::aggregate::{DEFAULT_ATTRIBUTE, DEFAULT_DISTANCES};
use crate::grid::{self, DEFAULT_RESOLUTION};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration. Each pipeline reads its own section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// H3 indexing of lat/lon records
    #[serde(default)]
    pub index: IndexConfig,

    /// Ring-neighbor aggregation over hex rows
    #[serde(default)]
    pub neighbors: NeighborsConfig,
}

/// Indexer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Input parquet file with latitude/longitude columns
    #[serde(default)]
    pub input_path: Option<PathBuf>,

    /// Output parquet file (input columns plus the index column)
    #[serde(default)]
    pub output_path: Option<PathBuf>,

    /// Rows per processing chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// H3 resolution level (0-15)
    #[serde(default = "default_resolution")]
    pub resolution: u8,

    /// Latitude column name
    #[serde(default = "default_lat_column")]
    pub lat_column: String,

    /// Longitude column name
    #[serde(default = "default_lon_column")]
    pub lon_column: String,

    /// Name of the appended cell column
    #[serde(default = "default_index_column")]
    pub index_column: String,

    /// Optional path to save run statistics as JSON
    #[serde(default)]
    pub stats_output_path: Option<PathBuf>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            input_path: None,
            output_path: None,
            chunk_size: default_chunk_size(),
            resolution: default_resolution(),
            lat_column: default_lat_column(),
            lon_column: default_lon_column(),
            index_column: default_index_column(),
            stats_output_path: None,
        }
    }
}

impl IndexConfig {
    pub fn input_path(&self) -> anyhow::Result<&Path> {
        self.input_path
            .as_deref()
            .context("index.input_path is not set")
    }

    pub fn output_path(&self) -> anyhow::Result<&Path> {
        self.output_path
            .as_deref()
            .context("index.output_path is not set")
    }

    /// Validate the indexer section.
    pub fn validate(&self) -> anyhow::Result<()> {
        let input = self.input_path()?;
        let output = self.output_path()?;
        if input == output {
            anyhow::bail!("index.input_path and index.output_path must differ");
        }
        if self.chunk_size == 0 {
            anyhow::bail!("Chunk size must be > 0");
        }
        grid::parse_resolution(self.resolution)?;
        for (key, name) in [
            ("lat_column", &self.lat_column),
            ("lon_column", &self.lon_column),
            ("index_column", &self.index_column),
        ] {
            if name.is_empty() {
                anyhow::bail!("index.{} must not be empty", key);
            }
        }
        Ok(())
    }
}

/// Neighbor aggregation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborsConfig {
    /// Input parquet file with cell and attribute columns
    #[serde(default)]
    pub input_path: Option<PathBuf>,

    /// Output parquet file (input columns plus one mean column per distance)
    #[serde(default)]
    pub output_path: Option<PathBuf>,

    /// Column holding hex cell identifiers
    #[serde(default = "default_cell_column")]
    pub cell_column: String,

    /// Numeric column to average
    #[serde(default = "default_attribute")]
    pub attribute: String,

    /// Ring distances, in output column order
    #[serde(default = "default_distances")]
    pub distances: Vec<u32>,

    /// Optional path to save run statistics as JSON
    #[serde(default)]
    pub stats_output_path: Option<PathBuf>,
}

impl Default for NeighborsConfig {
    fn default() -> Self {
        Self {
            input_path: None,
            output_path: None,
            cell_column: default_cell_column(),
            attribute: default_attribute(),
            distances: default_distances(),
            stats_output_path: None,
        }
    }
}

impl NeighborsConfig {
    pub fn input_path(&self) -> anyhow::Result<&Path> {
        self.input_path
            .as_deref()
            .context("neighbors.input_path is not set")
    }

    pub fn output_path(&self) -> anyhow::Result<&Path> {
        self.output_path
            .as_deref()
            .context("neighbors.output_path is not set")
    }

    /// Name of the output column for ring distance `d`.
    pub fn mean_column(&self, d: u32) -> String {
        format!("{}_neighbors_{}", self.attribute, d)
    }

    /// Validate the neighbors section.
    pub fn validate(&self) -> anyhow::Result<()> {
        let input = self.input_path()?;
        let output = self.output_path()?;
        if input == output {
            anyhow::bail!("neighbors.input_path and neighbors.output_path must differ");
        }
        if self.cell_column.is_empty() || self.attribute.is_empty() {
            anyhow::bail!("neighbors.cell_column and neighbors.attribute must not be empty");
        }
        if self.distances.is_empty() {
            anyhow::bail!("At least one ring distance is required");
        }
        if self.distances.contains(&0) {
            anyhow::bail!("Ring distances must be > 0");
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a YAML or JSON file.
    /// Format is auto-detected from file extension (.yaml, .yml, or .json).
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config: Config = match ext {
            "json" => serde_json::from_str(&contents)?,
            // YAML is a superset of JSON
            _ => serde_yaml::from_str(&contents)?,
        };
        Ok(config)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Load configuration from a JSON string.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Serialize configuration to YAML.
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Validate every section that names an input file.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut configured = false;
        if self.index.input_path.is_some() {
            self.index.validate()?;
            configured = true;
        }
        if self.neighbors.input_path.is_some() {
            self.neighbors.validate()?;
            configured = true;
        }
        if !configured {
            anyhow::bail!("No pipeline configured: set index.input_path or neighbors.input_path");
        }
        Ok(())
    }
}

// Default value functions for serde
fn default_chunk_size() -> usize { 1_000_000 }
fn default_resolution() -> u8 { DEFAULT_RESOLUTION }
fn default_lat_column() -> String { "lat".to_string() }
fn default_lon_column() -> String { "lon".to_string() }
fn default_index_column() -> String { "h3_index".to_string() }
fn default_cell_column() -> String { "hex_id".to_string() }
fn default_attribute() -> String { DEFAULT_ATTRIBUTE.to_string() }
fn default_distances() -> Vec<u32> { DEFAULT_DISTANCES.to_vec() }

#[cfg(test)]
mod tests {
    use super::*;

    fn index_config() -> IndexConfig {
        IndexConfig {
            input_path: Some("in.parquet".into()),
            output_path: Some("out.parquet".into()),
            ..IndexConfig::default()
        }
    }

    fn neighbors_config() -> NeighborsConfig {
        NeighborsConfig {
            input_path: Some("hexes.parquet".into()),
            output_path: Some("hexes_out.parquet".into()),
            ..NeighborsConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.index.chunk_size, 1_000_000);
        assert_eq!(config.index.resolution, 8);
        assert_eq!(config.index.lat_column, "lat");
        assert_eq!(config.index.lon_column, "lon");
        assert_eq!(config.index.index_column, "h3_index");
        assert_eq!(config.neighbors.cell_column, "hex_id");
        assert_eq!(config.neighbors.attribute, "cost_of_living");
        assert_eq!(config.neighbors.distances, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_config_validation_index() {
        assert!(index_config().validate().is_ok());

        let mut config = index_config();
        config.chunk_size = 0;
        assert!(config.validate().is_err());

        let mut config = index_config();
        config.resolution = 16;
        assert!(config.validate().is_err());

        let mut config = index_config();
        config.output_path = config.input_path.clone();
        assert!(config.validate().is_err());

        let mut config = index_config();
        config.index_column.clear();
        assert!(config.validate().is_err());

        let mut config = index_config();
        config.output_path = None;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("index.output_path"));
    }

    #[test]
    fn test_config_validation_neighbors() {
        assert!(neighbors_config().validate().is_ok());

        let mut config = neighbors_config();
        config.distances.clear();
        assert!(config.validate().is_err());

        let mut config = neighbors_config();
        config.distances = vec![1, 0];
        assert!(config.validate().is_err());

        let mut config = neighbors_config();
        config.attribute.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_requires_a_pipeline() {
        assert!(Config::default().validate().is_err());

        let config = Config {
            index: index_config(),
            neighbors: NeighborsConfig::default(),
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_mean_column_name() {
        assert_eq!(neighbors_config().mean_column(3), "cost_of_living_neighbors_3");
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
index:
  input_path: data/mobility.parquet
  output_path: data/mobility_enriched.parquet
  chunk_size: 500
neighbors:
  input_path: data/hexes.parquet
  output_path: data/hexes_out.parquet
  attribute: rent
  distances: [1, 3]
"#;
        let config = Config::from_yaml(yaml).unwrap();

        assert_eq!(config.index.chunk_size, 500);
        assert_eq!(config.index.resolution, 8);
        assert_eq!(config.neighbors.attribute, "rent");
        assert_eq!(config.neighbors.distances, vec![1, 3]);
        assert_eq!(config.neighbors.cell_column, "hex_id");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{"index": {"input_path": "a.parquet", "output_path": "b.parquet", "resolution": 9}}"#;
        let config = Config::from_json(json).unwrap();

        assert_eq!(config.index.resolution, 9);
        assert_eq!(config.neighbors.distances, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_yaml_roundtrip_keeps_sections() {
        let config = Config {
            index: index_config(),
            neighbors: neighbors_config(),
        };
        let parsed = Config::from_yaml(&config.to_yaml().unwrap()).unwrap();

        assert_eq!(parsed.index.input_path, config.index.input_path);
        assert_eq!(parsed.neighbors.output_path, config.neighbors.output_path);
    }
}
