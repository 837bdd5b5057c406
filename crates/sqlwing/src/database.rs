use std::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use sqlwing_engine::{Engine, Relation};
use tracing::debug;

use crate::coerce::Materialized;
use crate::dispatch::{Describable, Evaluable, Materializable};
use crate::errors::{Error, Result};
use crate::output::Output;
use crate::step::{Format, Step};
use crate::table::{HIDDEN_TABLE, Source, Table};

/// Named tables, in insertion order.
///
/// SQL applied to a database must name the tables it reads; every table is
/// visible under its name.
#[derive(Clone)]
pub struct Database {
    engine: Arc<Engine>,
    tables: Arc<IndexMap<String, Table>>,
    hidden: bool,
    /// Built from `tables` on first use, then never touched again.
    relations: Arc<OnceLock<IndexMap<String, Relation>>>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("tables", &self.tables.keys().collect::<Vec<_>>())
            .field("hidden", &self.hidden)
            .finish()
    }
}

impl Database {
    /// Load every source as a table under its name.
    ///
    /// A later source with the same name replaces an earlier one.
    pub fn new<I, K, S>(engine: &Arc<Engine>, sources: I) -> Result<Database>
    where
        I: IntoIterator<Item = (K, S)>,
        K: Into<String>,
        S: Into<Source>,
    {
        let tables = sources
            .into_iter()
            .map(|(name, source)| Ok((name.into(), Table::new(engine, source)?)))
            .collect::<Result<IndexMap<_, _>>>()?;
        Ok(Database::from_table_map(engine, tables))
    }

    pub fn from_tables<I, K>(engine: &Arc<Engine>, tables: I) -> Database
    where
        I: IntoIterator<Item = (K, Table)>,
        K: Into<String>,
    {
        let tables = tables.into_iter().map(|(k, t)| (k.into(), t)).collect();
        Database::from_table_map(engine, tables)
    }

    fn from_table_map(engine: &Arc<Engine>, tables: IndexMap<String, Table>) -> Database {
        Database {
            engine: engine.clone(),
            tables: Arc::new(tables),
            hidden: false,
            relations: Arc::new(OnceLock::new()),
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn tables(&self) -> &IndexMap<String, Table> {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::MissingTable(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Relations of every table keyed by table name.
    pub fn relations(&self) -> &IndexMap<String, Relation> {
        self.relations.get_or_init(|| {
            debug!(tables = self.tables.len(), "building relation cache");
            self.tables
                .iter()
                .map(|(name, table)| (name.clone(), table.relation().clone()))
                .collect()
        })
    }

    /// Whether the relation cache has been built.
    pub fn relations_cached(&self) -> bool {
        self.relations.get().is_some()
    }

    /// Run a query with every table visible under its name.
    pub fn sql(&self, sql: &str) -> Result<Table> {
        let bindings: Vec<(&str, &Relation)> = self
            .relations()
            .iter()
            .map(|(name, rel)| (name.as_str(), rel))
            .collect();
        let rel = self.engine.query(sql, &bindings)?;
        Ok(Table::from_relation(rel))
    }
}

impl Evaluable for Database {
    fn apply_step(&self, step: Step) -> Result<Output> {
        match step {
            Step::Format(format) => Ok(Output::MaterializedMap(self.hold(format)?)),
            Step::Callable(f) => f(Output::Database(self.clone())),
            Step::Sequence(ops) => self.run(ops),
            step @ (Step::Scalar(_) | Step::List | Step::Mapping) => {
                Err(Error::UnsupportedStep(step.kind()))
            }
            // Aliasing is only meaningful for a single table, the directive
            // goes to the engine as is.
            Step::Alias { text: sql, .. }
            | Step::SqlText(sql)
            | Step::FilePath { sql, .. } => Ok(Output::Table(self.sql(&sql)?)),
        }
    }
}

impl Materializable for Database {
    type Materialized = IndexMap<String, Materialized>;

    fn hold(&self, format: Format) -> Result<Self::Materialized> {
        self.tables
            .iter()
            .map(|(name, table)| Ok((name.clone(), table.hold(format)?)))
            .collect()
    }
}

impl Describable for Database {
    fn render(&self) -> Result<String> {
        if self.tables.is_empty() {
            return Ok("Database: None".to_string());
        }

        let mut out = String::from("Database:");
        for (name, table) in self.tables.iter() {
            let desc = if self.hidden {
                HIDDEN_TABLE.to_string()
            } else {
                table.rowcols()?
            };
            out.push_str(&format!("\n    {name}: {desc}"));
        }
        Ok(out)
    }

    fn is_hidden(&self) -> bool {
        self.hidden
    }

    fn with_hidden(&self, hidden: bool) -> Self {
        Database {
            hidden,
            ..self.clone()
        }
    }
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Ok(s) => f.write_str(&s),
            Err(e) => write!(f, "<Database error: {e}>"),
        }
    }
}
