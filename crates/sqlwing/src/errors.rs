use sqlwing_engine::{EngineError, Value};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot apply a step to a {0} value, expected a table or database")]
    InvalidOperand(&'static str),

    #[error("result should have a single row or column, but has shape ({rows}, {columns})")]
    Shape { rows: usize, columns: usize },

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("step '{0}' cannot be applied to a database")]
    UnsupportedStep(&'static str),

    #[error("cannot convert {value} to {target}")]
    Conversion { value: Value, target: &'static str },

    #[error("no table named '{0}'")]
    MissingTable(String),

    #[error("alias directive '{0}' has no name")]
    EmptyAlias(String),

    #[error(transparent)]
    Engine(EngineError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    External(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap an error raised by a user callable.
    pub fn external(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::External(err.into())
    }
}

impl From<EngineError> for Error {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::UnsupportedFormat(msg) => Error::UnsupportedFormat(msg),
            EngineError::Io(err) => Error::Io(err),
            other => Error::Engine(other),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
