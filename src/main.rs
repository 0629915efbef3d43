//! H3 Enrichment CLI
//!
//! Index lat/lon Parquet files with H3 cells and aggregate neighbor means.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use h3_enrich::{run_indexer, run_neighbors, Config};

const DEFAULT_CONFIG: &str = "config.yaml";

#[derive(Parser)]
#[command(name = "h3-enrich")]
#[command(about = "Tag lat/lon records with H3 cells and aggregate ring-neighbor means", long_about = None)]
struct Cli {
    /// Path to configuration file (default: config.yaml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an H3 cell column to a Parquet file (default if no command specified)
    Index(IndexArgs),

    /// Compute ring-neighbor means of an attribute per hex row
    Neighbors(NeighborsArgs),

    /// Validate configuration
    Validate,

    /// Generate a sample configuration file
    GenerateConfig {
        /// Output path for configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        output: PathBuf,
    },
}

#[derive(Args, Default)]
struct IndexArgs {
    /// Input Parquet file
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output Parquet file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Rows per processing chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    /// H3 resolution (0-15)
    #[arg(long)]
    resolution: Option<u8>,
}

#[derive(Args, Default)]
struct NeighborsArgs {
    /// Input Parquet file
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output Parquet file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Attribute column to average
    #[arg(long)]
    attribute: Option<String>,

    /// Ring distances, comma separated
    #[arg(long, value_delimiter = ',')]
    distances: Option<Vec<u32>>,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        None => index_command(cli.config.as_deref(), IndexArgs::default())?,

        Some(Commands::Index(args)) => index_command(cli.config.as_deref(), args)?,

        Some(Commands::Neighbors(args)) => neighbors_command(cli.config.as_deref(), args)?,

        Some(Commands::Validate) => validate_command(cli.config.as_deref())?,

        Some(Commands::GenerateConfig { output }) => generate_config_command(output)?,
    }

    Ok(())
}

/// Load the given config file, or `config.yaml` if present, or built-in defaults.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None if Path::new(DEFAULT_CONFIG).exists() => Config::from_file(Path::new(DEFAULT_CONFIG)),
        None => Ok(Config::default()),
    }
}

fn apply_index_args(config: &mut Config, args: IndexArgs) {
    if let Some(input) = args.input {
        config.index.input_path = Some(input);
    }
    if let Some(output) = args.output {
        config.index.output_path = Some(output);
    }
    if let Some(chunk_size) = args.chunk_size {
        config.index.chunk_size = chunk_size;
    }
    if let Some(resolution) = args.resolution {
        config.index.resolution = resolution;
    }
}

fn apply_neighbors_args(config: &mut Config, args: NeighborsArgs) {
    if let Some(input) = args.input {
        config.neighbors.input_path = Some(input);
    }
    if let Some(output) = args.output {
        config.neighbors.output_path = Some(output);
    }
    if let Some(attribute) = args.attribute {
        config.neighbors.attribute = attribute;
    }
    if let Some(distances) = args.distances {
        config.neighbors.distances = distances;
    }
}

fn index_command(config_path: Option<&Path>, args: IndexArgs) -> Result<()> {
    let mut config = load_config(config_path)?;
    apply_index_args(&mut config, args);
    config.index.validate()?;

    run_indexer(&config)?;
    Ok(())
}

fn neighbors_command(config_path: Option<&Path>, args: NeighborsArgs) -> Result<()> {
    let mut config = load_config(config_path)?;
    apply_neighbors_args(&mut config, args);
    config.neighbors.validate()?;

    run_neighbors(&config)?;
    Ok(())
}

fn validate_command(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    config.validate()?;
    println!("Configuration is valid");
    Ok(())
}

fn generate_config_command(output: PathBuf) -> Result<()> {
    // Generate a commented YAML config
    let yaml = r#"# H3 Enrichment Configuration

# === INDEX: tag lat/lon records with H3 cells ===
index:
  # Parquet file with latitude/longitude columns
  input_path: "data/mobility_data.parquet"

  # Parquet file to write (input columns + index column)
  output_path: "data/mobility_data_enriched.parquet"

  # Rows read, indexed and written per chunk (bounds peak memory)
  chunk_size: 1000000

  # H3 resolution (0-15). 8 is ~0.74 km² per hexagon
  resolution: 8

  # Input coordinate columns (WGS84 degrees)
  lat_column: "lat"
  lon_column: "lon"

  # Name of the appended cell column. Unconvertible rows get "unknown"
  index_column: "h3_index"

  # Optional path to save run statistics as JSON
  # stats_output_path: "index_stats.json"

# === NEIGHBORS: ring-neighbor means per hex row ===
neighbors:
  input_path: "data/hexes.parquet"
  output_path: "data/hexes_neighbors.parquet"

  # Column holding H3 cell identifiers
  cell_column: "hex_id"

  # Numeric column to average
  attribute: "cost_of_living"

  # Ring distances; one output column "<attribute>_neighbors_<d>" each.
  # Rings are cumulative: distance d covers every cell 1..=d steps away.
  distances: [1, 2, 3, 4]

  # stats_output_path: "neighbor_stats.json"
"#;

    std::fs::write(&output, yaml)?;
    println!("Generated sample configuration at: {}", output.display());

    Ok(())
}
