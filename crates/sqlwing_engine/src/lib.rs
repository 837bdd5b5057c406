//! Embedded SQL engine backing sqlwing tables and databases.
//!
//! Relations are stored as SQLite temp tables owned by an [`Engine`]. Results
//! come back as [`Frame`]s or arrow record batches.

pub mod config;
pub mod convert;
pub mod dialect;
pub mod engine;
pub mod errors;
pub mod frame;
pub mod io;
pub mod names;
pub mod relation;
pub mod value;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use engine::Engine;
pub use errors::{EngineError, Result};
pub use frame::{Column, Frame};
pub use relation::Relation;
pub use value::Value;
