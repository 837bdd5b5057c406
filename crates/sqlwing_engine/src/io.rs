//! Reading and writing relation data files.

use std::fs::File;
use std::io::{BufReader, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::csv::reader::Format;
use arrow::datatypes::Schema;
use arrow::error::ArrowError;
use arrow::json::reader::infer_json_schema_from_seekable;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::debug;
use url::Url;

use crate::errors::{EngineError, Result};

/// File formats the engine reads and writes, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Tsv,
    Parquet,
    /// Newline delimited json.
    Json,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        Ok(match ext.as_str() {
            "csv" => FileFormat::Csv,
            "tsv" => FileFormat::Tsv,
            "parquet" => FileFormat::Parquet,
            "json" | "jsonl" | "ndjson" => FileFormat::Json,
            _ => {
                return Err(EngineError::UnsupportedFormat(format!(
                    "unrecognized file extension for '{}'",
                    path.display()
                )));
            }
        })
    }

    fn delimiter(&self) -> u8 {
        match self {
            FileFormat::Tsv => b'\t',
            _ => b',',
        }
    }
}

/// Resolve a user supplied location into a local path.
///
/// Plain paths are returned as-is and `file://` urls are converted. Any other
/// url scheme is rejected since the engine has no remote reader.
pub fn resolve_location(location: &str) -> Result<PathBuf> {
    match Url::parse(location) {
        // Single letter schemes are windows drive letters, not urls.
        Ok(url) if url.scheme().len() > 1 => {
            if url.scheme() != "file" {
                return Err(EngineError::UnsupportedSource(format!(
                    "cannot read from '{}' urls",
                    url.scheme()
                )));
            }
            url.to_file_path().map_err(|_| {
                EngineError::UnsupportedSource(format!("invalid file url: {location}"))
            })
        }
        _ => Ok(PathBuf::from(location)),
    }
}

/// Read a data file into arrow batches.
pub fn read_file(path: &Path, infer_records: usize) -> Result<(Arc<Schema>, Vec<RecordBatch>)> {
    let format = FileFormat::from_path(path)?;
    debug!(path = %path.display(), ?format, "reading file");

    let mut file = File::open(path)?;
    match format {
        FileFormat::Csv | FileFormat::Tsv => {
            let csv_format = Format::default()
                .with_header(true)
                .with_delimiter(format.delimiter());
            let (schema, _) = csv_format.infer_schema(&mut file, Some(infer_records))?;
            file.rewind()?;

            let schema = Arc::new(schema);
            let batches = arrow::csv::ReaderBuilder::new(schema.clone())
                .with_format(csv_format)
                .build(file)?
                .collect::<Result<Vec<_>, ArrowError>>()?;
            Ok((schema, batches))
        }
        FileFormat::Json => {
            let mut reader = BufReader::new(file);
            let (schema, _) = infer_json_schema_from_seekable(&mut reader, Some(infer_records))?;
            let schema = Arc::new(schema);
            let batches = arrow::json::ReaderBuilder::new(schema.clone())
                .build(reader)?
                .collect::<Result<Vec<_>, ArrowError>>()?;
            Ok((schema, batches))
        }
        FileFormat::Parquet => {
            let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
            let schema = builder.schema().clone();
            let batches = builder
                .build()?
                .collect::<Result<Vec<_>, ArrowError>>()?;
            Ok((schema, batches))
        }
    }
}

/// Write a batch to a data file, overwriting any existing file.
pub fn write_file(path: &Path, batch: &RecordBatch) -> Result<()> {
    let format = FileFormat::from_path(path)?;
    debug!(path = %path.display(), ?format, rows = batch.num_rows(), "writing file");

    let file = File::create(path)?;
    match format {
        FileFormat::Csv | FileFormat::Tsv => {
            let mut writer = arrow::csv::WriterBuilder::new()
                .with_header(true)
                .with_delimiter(format.delimiter())
                .build(file);
            writer.write(batch)?;
        }
        FileFormat::Json => {
            let mut writer = arrow::json::LineDelimitedWriter::new(file);
            writer.write(batch)?;
            writer.finish()?;
        }
        FileFormat::Parquet => {
            let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
            writer.write(batch)?;
            writer.close()?;
        }
    }

    Ok(())
}
