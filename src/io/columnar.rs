//! Parquet reading and chunk-append writing.

use anyhow::{Context, Result};
use arrow::array::{Array, ArrayRef, Float64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Streaming reader over a Parquet file in fixed-size record batches.
pub struct ChunkReader {
    reader: ParquetRecordBatchReader,
    total_rows: u64,
}

impl ChunkReader {
    /// Open `path`, yielding batches of at most `chunk_size` rows.
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open parquet file: {}", path.display()))?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(file)
            .with_context(|| format!("Failed to read parquet metadata: {}", path.display()))?;
        let total_rows = builder.metadata().file_metadata().num_rows().max(0) as u64;
        let reader = builder.with_batch_size(chunk_size).build()?;

        Ok(Self { reader, total_rows })
    }

    /// Row count recorded in the file footer.
    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }
}

impl Iterator for ChunkReader {
    type Item = Result<RecordBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader
            .next()
            .map(|batch| batch.context("Failed to decode parquet chunk"))
    }
}

/// Load every record batch of a Parquet file into memory.
pub fn read_table(path: &Path) -> Result<Vec<RecordBatch>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open parquet file: {}", path.display()))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut batches = Vec::new();
    for batch_result in reader {
        batches.push(batch_result?);
    }
    Ok(batches)
}

/// Writer properties shared by all outputs: dictionary-encoded, Snappy.
pub fn writer_properties() -> WriterProperties {
    WriterProperties::builder()
        .set_dictionary_enabled(true)
        .set_compression(Compression::SNAPPY)
        .build()
}

/// Parquet writer that is opened lazily from the first chunk's schema.
///
/// Nothing is created on disk until the first [`write`](Self::write).
/// [`close`](Self::close) consumes the writer, so the footer is written at most once.
pub struct ChunkWriter {
    path: PathBuf,
    writer: Option<ArrowWriter<File>>,
    rows_written: u64,
}

impl ChunkWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
            rows_written: 0,
        }
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Append a chunk, creating the file from this chunk's schema on first use.
    pub fn write(&mut self, batch: &RecordBatch) -> Result<()> {
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => {
                let file = File::create(&self.path).with_context(|| {
                    format!("Failed to create output file: {}", self.path.display())
                })?;
                ArrowWriter::try_new(file, batch.schema(), Some(writer_properties()))?
            }
        };

        self.writer
            .insert(writer)
            .write(batch)
            .with_context(|| format!("Failed to write chunk to {}", self.path.display()))?;
        self.rows_written += batch.num_rows() as u64;
        Ok(())
    }

    /// Flush and write the footer. Returns whether a file was written.
    pub fn close(self) -> Result<bool> {
        match self.writer {
            Some(writer) => {
                writer
                    .close()
                    .with_context(|| format!("Failed to finalize {}", self.path.display()))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Find a column index by name.
pub fn find_column(schema: &Schema, name: &str) -> Result<usize> {
    schema
        .index_of(name)
        .with_context(|| format!("Column '{}' not found in schema", name))
}

/// Read a numeric column as Float64, casting other numeric types.
pub fn f64_column(batch: &RecordBatch, name: &str) -> Result<Float64Array> {
    let idx = find_column(&batch.schema(), name)?;
    let casted = cast(batch.column(idx), &DataType::Float64)
        .with_context(|| format!("Column '{}' is not numeric", name))?;
    let values = casted
        .as_any()
        .downcast_ref::<Float64Array>()
        .with_context(|| format!("Column '{}' did not cast to Float64", name))?;
    Ok(values.clone())
}

/// Read a string-like column (Utf8, LargeUtf8, dictionary) as Utf8.
pub fn utf8_column(batch: &RecordBatch, name: &str) -> Result<StringArray> {
    let idx = find_column(&batch.schema(), name)?;
    let casted = cast(batch.column(idx), &DataType::Utf8)
        .with_context(|| format!("Column '{}' is not a string column", name))?;
    let values = casted
        .as_any()
        .downcast_ref::<StringArray>()
        .with_context(|| format!("Column '{}' did not cast to Utf8", name))?;
    Ok(values.clone())
}

/// Append a column, replacing any existing column of the same name in place.
///
/// `nullable` is fixed by the caller so every chunk of a file gets the same schema.
pub fn with_column(
    batch: &RecordBatch,
    name: &str,
    values: ArrayRef,
    nullable: bool,
) -> Result<RecordBatch> {
    let schema = batch.schema();
    let field = Arc::new(Field::new(name, values.data_type().clone(), nullable));

    let mut fields: Vec<_> = schema.fields().iter().cloned().collect();
    let mut columns: Vec<ArrayRef> = batch.columns().to_vec();

    match schema.index_of(name) {
        Ok(idx) => {
            fields[idx] = field;
            columns[idx] = values;
        }
        Err(_) => {
            fields.push(field);
            columns.push(values);
        }
    }

    let schema = Schema::new_with_metadata(fields, schema.metadata().clone());
    RecordBatch::try_new(Arc::new(schema), columns)
        .with_context(|| format!("Failed to attach column '{}'", name))
}
