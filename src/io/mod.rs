//! Parquet I/O for chunked reading and writing.

mod columnar;

pub use columnar::{
    f64_column, find_column, read_table, utf8_column, with_column, writer_properties, ChunkReader,
    ChunkWriter,
};
