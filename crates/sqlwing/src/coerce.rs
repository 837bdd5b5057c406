//! Converting materialized results into plain values.

use arrow::record_batch::RecordBatch;
use indexmap::IndexMap;
use sqlwing_engine::{Frame, Value};

use crate::errors::{Error, Result};
use crate::output::Output;
use crate::step::ScalarKind;

/// A relation materialized in memory.
#[derive(Debug, Clone, PartialEq)]
pub enum Materialized {
    Arrow(RecordBatch),
    Frame(Frame),
}

impl Materialized {
    pub fn num_rows(&self) -> usize {
        match self {
            Materialized::Arrow(batch) => batch.num_rows(),
            Materialized::Frame(frame) => frame.num_rows(),
        }
    }

    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        match self {
            Materialized::Arrow(batch) => Ok(batch.clone()),
            Materialized::Frame(frame) => Ok(frame.to_record_batch()?),
        }
    }
}

/// Values of the only column, or of the only row.
pub fn aslist(frame: &Frame) -> Result<Vec<Value>> {
    let (rows, columns) = frame.shape();
    if columns == 1 {
        return Ok(frame.column(0).unwrap_or_default());
    }
    if rows == 1 {
        return Ok(frame.row(0).map(|r| r.to_vec()).unwrap_or_default());
    }
    Err(Error::Shape { rows, columns })
}

/// First value of [`aslist`].
pub fn asitem(frame: &Frame) -> Result<Value> {
    aslist(frame)?
        .into_iter()
        .next()
        .ok_or(Error::Shape {
            rows: frame.num_rows(),
            columns: frame.num_columns(),
        })
}

/// The first row keyed by column name. Any further rows are ignored.
pub fn asdict(frame: &Frame) -> Result<IndexMap<String, Value>> {
    let row = frame.row(0).ok_or(Error::Shape {
        rows: 0,
        columns: frame.num_columns(),
    })?;
    Ok(frame
        .columns
        .iter()
        .zip(row)
        .map(|(col, val)| (col.name.clone(), val.clone()))
        .collect())
}

/// Convert the single item of a frame to a scalar.
pub fn scalar(frame: &Frame, kind: ScalarKind) -> Result<Output> {
    let value = asitem(frame)?;
    Ok(match kind {
        ScalarKind::Int => Output::Int(to_int(&value)?),
        ScalarKind::Float => Output::Float(to_float(&value)?),
        ScalarKind::Bool => Output::Bool(to_bool(&value)),
        ScalarKind::Str => Output::Str(to_str(&value)),
    })
}

/// Integer value, truncating reals and parsing text.
pub fn to_int(value: &Value) -> Result<i64> {
    match value {
        Value::Integer(i) => Ok(*i),
        Value::Real(r) if r.is_finite() && r.abs() < i64::MAX as f64 => Ok(r.trunc() as i64),
        Value::Text(t) => t.trim().parse().map_err(|_| conversion(value, "int")),
        _ => Err(conversion(value, "int")),
    }
}

pub fn to_float(value: &Value) -> Result<f64> {
    match value {
        Value::Integer(i) => Ok(*i as f64),
        Value::Real(r) => Ok(*r),
        Value::Text(t) => t.trim().parse().map_err(|_| conversion(value, "float")),
        _ => Err(conversion(value, "float")),
    }
}

/// Truthiness: null, zero and empty values are false.
pub fn to_bool(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Integer(i) => *i != 0,
        Value::Real(r) => *r != 0.0,
        Value::Text(t) => !t.is_empty(),
        Value::Blob(b) => !b.is_empty(),
    }
}

pub fn to_str(value: &Value) -> String {
    value.to_string()
}

fn conversion(value: &Value, target: &'static str) -> Error {
    Error::Conversion {
        value: value.clone(),
        target,
    }
}
