use std::sync::Arc;

use arrow::array::{
    Array,
    ArrayRef,
    AsArray,
    BinaryBuilder,
    BooleanArray,
    Float64Array,
    Int64Array,
    NullArray,
    StringBuilder,
};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type, SchemaRef, UInt64Type};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};

use crate::errors::{EngineError, Result};
use crate::value::Value;

/// Converts engine rows into arrow record batches.
#[derive(Debug, Clone)]
pub struct Converter {
    schema: SchemaRef,
}

impl Converter {
    pub fn new(schema: SchemaRef) -> Self {
        Self { schema }
    }

    pub fn create_record_batch(&self, data: &[Vec<Value>]) -> Result<RecordBatch> {
        let mut cols: Vec<ArrayRef> = Vec::with_capacity(self.schema.fields().len());

        for (col_idx, field) in self.schema.fields().into_iter().enumerate() {
            let cell = |row: &Vec<Value>| -> Result<Value> {
                row.get(col_idx)
                    .cloned()
                    .ok_or(EngineError::MissingDataForColumn(col_idx))
            };

            let col: ArrayRef = match field.data_type() {
                DataType::Null => Arc::new(NullArray::new(data.len())),
                DataType::Boolean => Arc::new(
                    data.iter()
                        .map(|row| match cell(row)? {
                            Value::Null => Ok(None),
                            Value::Integer(i) => Ok(Some(i != 0)),
                            Value::Real(r) => Ok(Some(r != 0_f64)),
                            Value::Text(t) => parse_bool(&t),
                            v => Err(EngineError::InvalidConversion {
                                from: v,
                                to: DataType::Boolean,
                            }),
                        })
                        .collect::<Result<BooleanArray>>()?,
                ),
                DataType::Int64 => Arc::new(
                    data.iter()
                        .map(|row| match cell(row)? {
                            Value::Null => Ok(None),
                            Value::Integer(i) => Ok(Some(i)),
                            Value::Real(r) if r.trunc() == r => Ok(Some(r as i64)),
                            Value::Text(t) if t.is_empty() => Ok(None),
                            Value::Text(t) => {
                                t.parse::<i64>()
                                    .map(Some)
                                    .map_err(|_| EngineError::InvalidConversion {
                                        from: Value::Text(t),
                                        to: DataType::Int64,
                                    })
                            }
                            v => Err(EngineError::InvalidConversion {
                                from: v,
                                to: DataType::Int64,
                            }),
                        })
                        .collect::<Result<Int64Array>>()?,
                ),
                DataType::Float64 => Arc::new(
                    data.iter()
                        .map(|row| match cell(row)? {
                            Value::Null => Ok(None),
                            Value::Integer(i) => Ok(Some(i as f64)),
                            Value::Real(r) => Ok(Some(r)),
                            Value::Text(t) if t.is_empty() => Ok(None),
                            Value::Text(t) => {
                                t.parse::<f64>()
                                    .map(Some)
                                    .map_err(|_| EngineError::InvalidConversion {
                                        from: Value::Text(t),
                                        to: DataType::Float64,
                                    })
                            }
                            v => Err(EngineError::InvalidConversion {
                                from: v,
                                to: DataType::Float64,
                            }),
                        })
                        .collect::<Result<Float64Array>>()?,
                ),
                DataType::Utf8 => {
                    // Assuming an average length of each string to be 10
                    let mut builder = StringBuilder::with_capacity(data.len(), 10 * data.len());
                    for row in data {
                        match cell(row)? {
                            Value::Null => builder.append_null(),
                            Value::Text(t) => builder.append_value(t),
                            v => builder.append_value(v.to_string()),
                        }
                    }
                    Arc::new(builder.finish())
                }
                DataType::Binary => {
                    let mut builder = BinaryBuilder::with_capacity(data.len(), 10 * data.len());
                    for row in data {
                        match cell(row)? {
                            Value::Null => builder.append_null(),
                            Value::Blob(b) => builder.append_value(b),
                            Value::Text(t) => builder.append_value(t.as_bytes()),
                            Value::Integer(i) => builder.append_value(i.to_be_bytes()),
                            Value::Real(r) => builder.append_value(r.to_be_bytes()),
                        }
                    }
                    Arc::new(builder.finish())
                }
                other => {
                    return Err(EngineError::UnsupportedFormat(format!(
                        "cannot build arrow column of type {other}"
                    )));
                }
            };
            cols.push(col);
        }

        // Explicit row count keeps zero-column batches valid.
        let opts = RecordBatchOptions::new().with_row_count(Some(data.len()));
        Ok(RecordBatch::try_new_with_options(
            self.schema.clone(),
            cols,
            &opts,
        )?)
    }
}

fn parse_bool(t: &str) -> Result<Option<bool>> {
    if t.eq_ignore_ascii_case("t") || t.eq_ignore_ascii_case("true") || t == "1" {
        Ok(Some(true))
    } else if t.eq_ignore_ascii_case("f") || t.eq_ignore_ascii_case("false") || t == "0" {
        Ok(Some(false))
    } else if t.is_empty() || t.eq_ignore_ascii_case("null") {
        Ok(None)
    } else {
        Err(EngineError::InvalidConversion {
            from: Value::Text(t.to_string()),
            to: DataType::Boolean,
        })
    }
}

/// SQLite declared type used when creating a table for an arrow column.
pub fn sqlite_decl_type(data_type: &DataType) -> &'static str {
    match data_type {
        DataType::Boolean
        | DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => "INTEGER",
        DataType::Float16 | DataType::Float32 | DataType::Float64 => "REAL",
        DataType::Binary | DataType::LargeBinary | DataType::BinaryView => "BLOB",
        // No affinity: INTEGER would turn out of range text back into REAL.
        DataType::UInt64 | DataType::Null => "",
        _ => "TEXT",
    }
}

/// Read every value of an arrow array as engine values.
///
/// Integer and float columns are widened to 64 bits, booleans become 0/1 and
/// anything else without a direct SQLite counterpart (dates, decimals, ...) is
/// cast to its string form. Unsigned 64 bit values past `i64::MAX` are kept
/// exact as text.
pub fn array_values(array: &dyn Array) -> Result<Vec<Value>> {
    let values = match array.data_type() {
        DataType::Null => vec![Value::Null; array.len()],
        DataType::Boolean => array
            .as_boolean()
            .iter()
            .map(|v| v.map(|b| Value::Integer(b as i64)).unwrap_or(Value::Null))
            .collect(),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => {
            let array = cast(array, &DataType::Int64)?;
            array
                .as_primitive::<Int64Type>()
                .iter()
                .map(Value::from)
                .collect()
        }
        DataType::UInt64 => array
            .as_primitive::<UInt64Type>()
            .iter()
            .map(|v| match v {
                Some(v) => i64::try_from(v)
                    .map(Value::Integer)
                    .unwrap_or_else(|_| Value::Text(v.to_string())),
                None => Value::Null,
            })
            .collect(),
        DataType::Float16 | DataType::Float32 | DataType::Float64 => {
            let array = cast(array, &DataType::Float64)?;
            array
                .as_primitive::<Float64Type>()
                .iter()
                .map(Value::from)
                .collect()
        }
        DataType::Binary | DataType::LargeBinary | DataType::BinaryView => {
            let array = cast(array, &DataType::Binary)?;
            array
                .as_binary::<i32>()
                .iter()
                .map(|v| v.map(|b| Value::Blob(b.to_vec())).unwrap_or(Value::Null))
                .collect()
        }
        _ => {
            let array = cast(array, &DataType::Utf8)?;
            array
                .as_string::<i32>()
                .iter()
                .map(|v| v.map(Value::from).unwrap_or(Value::Null))
                .collect()
        }
    };
    Ok(values)
}

#[cfg(test)]
mod tests {
    use arrow::array::{Int32Array, StringArray, UInt64Array};
    use arrow::datatypes::{Field, Schema};

    use super::*;

    #[test]
    fn rows_to_batch() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("a", DataType::Int64, true),
            Field::new("b", DataType::Utf8, true),
        ]));
        let rows = vec![
            vec![Value::Integer(1), Value::Text("x".to_string())],
            vec![Value::Null, Value::Integer(4)],
        ];
        let batch = Converter::new(schema).create_record_batch(&rows).unwrap();

        assert_eq!(2, batch.num_rows());
        let b = batch.column(1).as_string::<i32>();
        assert_eq!("x", b.value(0));
        assert_eq!("4", b.value(1));
        assert!(batch.column(0).is_null(1));
    }

    #[test]
    fn rows_to_batch_bad_int() {
        let schema = Arc::new(Schema::new(vec![Field::new("a", DataType::Int64, true)]));
        let rows = vec![vec![Value::Text("nope".to_string())]];
        let err = Converter::new(schema).create_record_batch(&rows).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConversion { .. }));
    }

    #[test]
    fn arrow_to_values() {
        let ints = Int32Array::from(vec![Some(1), None]);
        assert_eq!(
            vec![Value::Integer(1), Value::Null],
            array_values(&ints).unwrap()
        );

        let strs = StringArray::from(vec!["a"]);
        assert_eq!(vec![Value::Text("a".to_string())], array_values(&strs).unwrap());
    }

    #[test]
    fn large_unsigned_stay_exact() {
        let ids = UInt64Array::from(vec![Some(1), Some(u64::MAX), None]);
        assert_eq!(
            vec![
                Value::Integer(1),
                Value::Text("18446744073709551615".to_string()),
                Value::Null,
            ],
            array_values(&ids).unwrap()
        );
    }
}
