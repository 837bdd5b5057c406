use std::fmt;

use indexmap::IndexMap;
use sqlwing_engine::Value;
use tracing::debug;

use crate::coerce::Materialized;
use crate::database::Database;
use crate::dispatch::Evaluable;
use crate::errors::{Error, Result};
use crate::op::Op;
use crate::step::Step;
use crate::table::Table;

/// The value flowing through a chain.
///
/// Only tables and databases accept further steps, every other variant is
/// terminal.
#[derive(Debug, Clone)]
pub enum Output {
    Table(Table),
    Database(Database),
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    List(Vec<Value>),
    Dict(IndexMap<String, Value>),
    Materialized(Materialized),
    /// Every table of a database, materialized.
    MaterializedMap(IndexMap<String, Materialized>),
}

impl Output {
    pub fn kind(&self) -> &'static str {
        match self {
            Output::Table(_) => "table",
            Output::Database(_) => "database",
            Output::Int(_) => "int",
            Output::Float(_) => "float",
            Output::Str(_) => "str",
            Output::Bool(_) => "bool",
            Output::List(_) => "list",
            Output::Dict(_) => "dict",
            Output::Materialized(_) => "materialized",
            Output::MaterializedMap(_) => "materialized map",
        }
    }

    /// Apply `ops` left to right.
    pub fn run<I>(self, ops: I) -> Result<Output>
    where
        I: IntoIterator,
        I::Item: Into<Op>,
    {
        ops.into_iter()
            .try_fold(self, |carrier, op| carrier.apply(op.into()))
    }

    /// Apply a single op.
    pub fn apply(self, op: Op) -> Result<Output> {
        match self {
            Output::Table(table) => {
                let step = Step::classify(op)?;
                debug!(step = step.kind(), carrier = "table", "applying step");
                table.apply_step(step)
            }
            Output::Database(db) => {
                let step = Step::classify(op)?;
                debug!(step = step.kind(), carrier = "database", "applying step");
                db.apply_step(step)
            }
            other => Err(Error::InvalidOperand(other.kind())),
        }
    }

    pub fn into_table(self) -> Result<Table> {
        match self {
            Output::Table(table) => Ok(table),
            other => Err(Error::InvalidOperand(other.kind())),
        }
    }

    pub fn into_database(self) -> Result<Database> {
        match self {
            Output::Database(db) => Ok(db),
            other => Err(Error::InvalidOperand(other.kind())),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Output::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Output::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Output::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Output::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Output::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Output::Dict(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_materialized(&self) -> Option<&Materialized> {
        match self {
            Output::Materialized(m) => Some(m),
            _ => None,
        }
    }
}

impl From<Table> for Output {
    fn from(table: Table) -> Self {
        Output::Table(table)
    }
}

impl From<Database> for Output {
    fn from(db: Database) -> Self {
        Output::Database(db)
    }
}

impl From<i64> for Output {
    fn from(i: i64) -> Self {
        Output::Int(i)
    }
}

impl From<f64> for Output {
    fn from(f: f64) -> Self {
        Output::Float(f)
    }
}

impl From<bool> for Output {
    fn from(b: bool) -> Self {
        Output::Bool(b)
    }
}

impl From<String> for Output {
    fn from(s: String) -> Self {
        Output::Str(s)
    }
}

impl From<Vec<Value>> for Output {
    fn from(l: Vec<Value>) -> Self {
        Output::List(l)
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Table(table) => fmt::Display::fmt(table, f),
            Output::Database(db) => fmt::Display::fmt(db, f),
            Output::Int(i) => write!(f, "{i}"),
            Output::Float(v) => write!(f, "{}", Value::Real(*v)),
            Output::Str(s) => f.write_str(s),
            Output::Bool(b) => write!(f, "{b}"),
            Output::List(values) => {
                f.write_str("[")?;
                for (idx, v) in values.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
            Output::Dict(values) => {
                f.write_str("{")?;
                for (idx, (k, v)) in values.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Output::Materialized(m) => fmt_materialized(f, m),
            Output::MaterializedMap(map) => {
                for (idx, (name, m)) in map.iter().enumerate() {
                    if idx > 0 {
                        f.write_str("\n")?;
                    }
                    writeln!(f, "{name}:")?;
                    fmt_materialized(f, m)?;
                }
                Ok(())
            }
        }
    }
}

fn fmt_materialized(f: &mut fmt::Formatter<'_>, m: &Materialized) -> fmt::Result {
    let rendered = m.to_record_batch().and_then(|batch| {
        arrow_util::pretty::pretty_format_preview(&batch, batch.num_rows(), None)
            .map_err(|e| Error::Engine(e.into()))
    });
    match rendered {
        Ok(s) => f.write_str(&s),
        Err(e) => write!(f, "<error: {e}>"),
    }
}
