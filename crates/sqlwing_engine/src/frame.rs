use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use indexmap::IndexMap;

use crate::convert::Converter;
use crate::errors::{EngineError, Result};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    /// Type declared by the source, if any. Values may still disagree with it
    /// since SQLite only applies affinities.
    pub decl_type: Option<DataType>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Column {
            name: name.into(),
            decl_type: None,
        }
    }
}

impl<'a> From<rusqlite::Column<'a>> for Column {
    fn from(col: rusqlite::Column<'a>) -> Self {
        let decl_type = col.decl_type().and_then(decl_type_to_arrow);
        Column {
            name: col.name().to_owned(),
            decl_type,
        }
    }
}

/// Map a SQLite declared type to an arrow type using SQLite's affinity rules.
fn decl_type_to_arrow(decl_type: &str) -> Option<DataType> {
    let decl_type = decl_type.to_ascii_lowercase();
    match decl_type.as_str() {
        "boolean" | "bool" => Some(DataType::Boolean),
        s if s.contains("int") => Some(DataType::Int64),
        s if s.contains("char") || s.contains("clob") || s.contains("text") => {
            Some(DataType::Utf8)
        }
        s if s.contains("real") || s.contains("floa") || s.contains("doub") => {
            Some(DataType::Float64)
        }
        s if s.contains("blob") => Some(DataType::Binary),
        _ => None,
    }
}

/// Fully materialized, row-oriented query result.
///
/// This is the dataframe-like representation handed out by the engine. Cells
/// are addressed by position, `iloc` style.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

impl Frame {
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Self {
        Frame { columns, rows }
    }

    /// Build a frame from column-oriented data. All columns must have the same
    /// length.
    pub fn from_columns<K, V>(columns: impl IntoIterator<Item = (K, Vec<V>)>) -> Result<Self>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let columns: IndexMap<String, Vec<Value>> = columns
            .into_iter()
            .map(|(k, vals)| (k.into(), vals.into_iter().map(Into::into).collect()))
            .collect();

        let num_rows = columns.values().next().map(|c| c.len()).unwrap_or(0);
        for (name, vals) in &columns {
            if vals.len() != num_rows {
                return Err(EngineError::ColumnLength {
                    column: name.clone(),
                    expected: num_rows,
                    found: vals.len(),
                });
            }
        }

        let names: Vec<Column> = columns.keys().map(Column::new).collect();
        let mut iters: Vec<_> = columns.into_values().map(|c| c.into_iter()).collect();
        let rows = (0..num_rows)
            .map(|_| {
                iters
                    .iter_mut()
                    .map(|it| it.next().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Ok(Frame {
            columns: names,
            rows,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.num_rows(), self.num_columns())
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Values of a column, top to bottom.
    pub fn column(&self, idx: usize) -> Option<Vec<Value>> {
        if idx >= self.num_columns() {
            return None;
        }
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).cloned().unwrap_or(Value::Null))
                .collect(),
        )
    }

    pub fn row(&self, idx: usize) -> Option<&[Value]> {
        self.rows.get(idx).map(|r| r.as_slice())
    }

    pub fn iloc(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Arrow schema for this frame.
    ///
    /// A column's type is inferred from its values, falling back to the declared
    /// type when every value is null.
    pub fn schema(&self) -> SchemaRef {
        let fields: Vec<Field> = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let inferred = infer_type(self.rows.iter().filter_map(|row| row.get(idx)));
                let data_type = match (inferred, &col.decl_type) {
                    (DataType::Null, Some(decl)) => decl.clone(),
                    (inferred, _) => inferred,
                };
                Field::new(&col.name, data_type, true)
            })
            .collect();
        Arc::new(Schema::new(fields))
    }

    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        Converter::new(self.schema()).create_record_batch(&self.rows)
    }
}

/// Narrowest arrow type able to hold every value.
pub fn infer_type<'a>(values: impl IntoIterator<Item = &'a Value>) -> DataType {
    let mut out = DataType::Null;
    for val in values {
        out = match (&out, val) {
            (_, Value::Null)
            | (DataType::Int64 | DataType::Float64, Value::Integer(_))
            | (DataType::Float64, Value::Real(_))
            | (DataType::Binary, Value::Blob(_))
            | (DataType::Utf8, _) => continue,
            (DataType::Null, Value::Integer(_)) => DataType::Int64,
            (DataType::Null | DataType::Int64, Value::Real(_)) => DataType::Float64,
            (DataType::Null, Value::Blob(_)) => DataType::Binary,
            // Text wins over everything else, mixed columns are displayed as
            // strings.
            _ => DataType::Utf8,
        };
    }
    out
}
