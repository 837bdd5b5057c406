use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use sqlwing::Coerce;

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum LoggingMode {
    #[default]
    Pretty,
    Json,
    Compact,
}

impl From<LoggingMode> for logutil::LoggingMode {
    fn from(mode: LoggingMode) -> Self {
        match mode {
            LoggingMode::Pretty => logutil::LoggingMode::Pretty,
            LoggingMode::Json => logutil::LoggingMode::Json,
            LoggingMode::Compact => logutil::LoggingMode::Compact,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Box tables for relations, plain text for everything else.
    #[default]
    Table,
    Json,
}

/// Coercion applied after the last step.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum IntoKind {
    Int,
    Str,
    Bool,
    Float,
    List,
    Dict,
}

impl From<IntoKind> for Coerce {
    fn from(kind: IntoKind) -> Self {
        match kind {
            IntoKind::Int => Coerce::Int,
            IntoKind::Str => Coerce::Str,
            IntoKind::Bool => Coerce::Bool,
            IntoKind::Float => Coerce::Float,
            IntoKind::List => Coerce::List,
            IntoKind::Dict => Coerce::Dict,
        }
    }
}

/// A `NAME=PATH` table definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableArg {
    pub name: String,
    pub location: String,
}

fn parse_table_arg(s: &str) -> Result<TableArg, String> {
    match s.split_once('=') {
        Some((name, location)) if !name.trim().is_empty() && !location.is_empty() => {
            Ok(TableArg {
                name: name.trim().to_string(),
                location: location.to_string(),
            })
        }
        _ => Err(format!("expected NAME=PATH, got '{s}'")),
    }
}

#[derive(Parser, Debug)]
#[clap(name = "sqlwing")]
#[clap(version)]
#[clap(about = "Run chains of SQL steps over tables and databases", long_about = None)]
pub struct Cli {
    /// Log verbosity.
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format.
    #[clap(long, value_enum)]
    pub log_mode: Option<LoggingMode>,

    /// Database file backing the engine. In-memory when omitted.
    #[clap(long, value_parser)]
    pub database: Option<PathBuf>,

    /// Statement to run once when the engine starts. May be repeated.
    #[clap(long = "init", value_parser)]
    pub init_statements: Vec<String>,

    /// Load a single table from a csv, tsv, parquet or json file.
    #[clap(short, long, value_parser, conflicts_with = "tables")]
    pub source: Option<String>,

    /// Load a named table into a database, as NAME=PATH. May be repeated.
    #[clap(short, long = "table", value_parser = parse_table_arg)]
    pub tables: Vec<TableArg>,

    /// Coerce the final result.
    #[clap(long, value_enum)]
    pub into: Option<IntoKind>,

    /// Display output mode.
    #[clap(long, value_enum, default_value_t = OutputMode::Table)]
    pub mode: OutputMode,

    /// Max number of rows to display.
    #[clap(long)]
    pub max_rows: Option<usize>,

    /// Max width for tables to display.
    #[clap(long)]
    pub max_width: Option<usize>,

    /// Print placeholders instead of querying row counts and previews.
    #[clap(long)]
    pub hide: bool,

    /// Steps applied in order: SQL, a file of SQL, `as NAME`, `arrow` or
    /// `pandas`.
    pub steps: Vec<String>,
}
