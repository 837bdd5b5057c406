use anyhow::Result;
use arrow::record_batch::RecordBatch;
use serde_json::{Map, Value as JsonValue};
use sqlwing::{
    Database,
    Describable,
    Engine,
    EngineConfigBuilder,
    Materialized,
    Op,
    Output,
    Table,
};
use tracing::debug;

use crate::args::{Cli, OutputMode};

/// Build the starting carrier, run every step and format the result.
pub fn execute(cli: &Cli) -> Result<String> {
    let mut config = EngineConfigBuilder::default();
    if let Some(path) = &cli.database {
        config.path(path.clone());
    }
    for stmt in &cli.init_statements {
        config.init_statement(stmt);
    }
    if let Some(rows) = cli.max_rows {
        config.preview_rows(rows);
    }
    if let Some(width) = cli.max_width {
        config.max_width(width);
    }
    let engine = Engine::open(config.build()?)?;

    let carrier: Output = match &cli.source {
        Some(source) => Table::new(&engine, source.as_str())?.into(),
        None => Database::new(
            &engine,
            cli.tables
                .iter()
                .map(|t| (t.name.clone(), t.location.clone())),
        )?
        .into(),
    };

    let mut ops: Vec<Op> = cli.steps.iter().map(Op::from).collect();
    if let Some(kind) = cli.into {
        ops.push(sqlwing::Coerce::from(kind).into());
    }
    debug!(steps = ops.len(), carrier = carrier.kind(), "running chain");

    let out = carrier.run(ops)?;
    match cli.mode {
        OutputMode::Table => format_text(&out, cli.hide),
        OutputMode::Json => Ok(serde_json::to_string(&to_json(&out)?)?),
    }
}

fn format_text(out: &Output, hide: bool) -> Result<String> {
    Ok(match out {
        Output::Table(table) if hide => table.hide().render()?,
        Output::Table(table) => table.render()?,
        Output::Database(db) if hide => db.hide().render()?,
        Output::Database(db) => db.render()?,
        other => other.to_string(),
    })
}

/// Relations become arrays of row objects, databases and dicts become objects.
pub fn to_json(out: &Output) -> Result<JsonValue> {
    Ok(match out {
        Output::Table(table) => batch_to_json(&table.arrow()?)?,
        Output::Database(db) => {
            let mut map = Map::new();
            for (name, table) in db.tables() {
                map.insert(name.clone(), batch_to_json(&table.arrow()?)?);
            }
            JsonValue::Object(map)
        }
        Output::Int(i) => JsonValue::from(*i),
        Output::Float(f) => JsonValue::from(*f),
        Output::Str(s) => JsonValue::from(s.as_str()),
        Output::Bool(b) => JsonValue::from(*b),
        Output::List(values) => serde_json::to_value(values)?,
        Output::Dict(values) => serde_json::to_value(values)?,
        Output::Materialized(m) => materialized_to_json(m)?,
        Output::MaterializedMap(map) => {
            let mut obj = Map::new();
            for (name, m) in map {
                obj.insert(name.clone(), materialized_to_json(m)?);
            }
            JsonValue::Object(obj)
        }
    })
}

fn materialized_to_json(m: &Materialized) -> Result<JsonValue> {
    batch_to_json(&m.to_record_batch()?)
}

fn batch_to_json(batch: &RecordBatch) -> Result<JsonValue> {
    if batch.num_rows() == 0 {
        return Ok(JsonValue::Array(Vec::new()));
    }
    let mut writer = arrow::json::ArrayWriter::new(Vec::new());
    writer.write(batch)?;
    writer.finish()?;
    Ok(serde_json::from_slice(&writer.into_inner())?)
}
