use arrow::datatypes::DataType;

use crate::value::Value;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error(transparent)]
    Tokenize(#[from] sqlparser::tokenizer::TokenizerError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("unsupported source: {0}")]
    UnsupportedSource(String),

    #[error("invalid conversion from {from} to {to}")]
    InvalidConversion { from: Value, to: DataType },

    #[error("cannot create a relation without columns")]
    NoColumns,

    #[error("missing data for column {0}")]
    MissingDataForColumn(usize),

    #[error("column '{column}' has {found} values, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

macro_rules! internal {
    ($($arg:tt)*) => {
        crate::errors::EngineError::Internal(std::format!($($arg)*))
    };
}
pub(crate) use internal;
