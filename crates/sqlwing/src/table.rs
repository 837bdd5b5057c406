use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use indexmap::IndexMap;
use sqlwing_engine::{Engine, Frame, Relation, Value};
use tracing::debug;

use crate::coerce::{self, Materialized};
use crate::database::Database;
use crate::dispatch::{Describable, Evaluable, Materializable};
use crate::errors::{Error, Result};
use crate::output::Output;
use crate::step::{Format, Step};

/// Placeholder printed instead of a hidden table.
pub(crate) const HIDDEN_TABLE: &str = "<Table(..., hidden=true)>";

/// Anything a table can be loaded from.
#[derive(Debug, Clone)]
pub enum Source {
    Columns(IndexMap<String, Vec<Value>>),
    Frame(Frame),
    Arrow(RecordBatch),
    Relation(Relation),
    Table(Table),
    /// File path or `file://` url.
    Location(String),
}

impl From<IndexMap<String, Vec<Value>>> for Source {
    fn from(cols: IndexMap<String, Vec<Value>>) -> Self {
        Source::Columns(cols)
    }
}

impl From<Frame> for Source {
    fn from(frame: Frame) -> Self {
        Source::Frame(frame)
    }
}

impl From<RecordBatch> for Source {
    fn from(batch: RecordBatch) -> Self {
        Source::Arrow(batch)
    }
}

impl From<Relation> for Source {
    fn from(rel: Relation) -> Self {
        Source::Relation(rel)
    }
}

impl From<Table> for Source {
    fn from(table: Table) -> Self {
        Source::Table(table)
    }
}

impl From<&str> for Source {
    fn from(s: &str) -> Self {
        Source::Location(s.to_string())
    }
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        Source::Location(s)
    }
}

impl From<&Path> for Source {
    fn from(p: &Path) -> Self {
        Source::Location(p.to_string_lossy().into_owned())
    }
}

impl From<PathBuf> for Source {
    fn from(p: PathBuf) -> Self {
        Source::from(p.as_path())
    }
}

/// A single relation.
///
/// SQL applied to a table always reads from the table itself: the snippet is
/// prefixed with `from <name>` where `<name>` is a fresh scratch name bound to
/// this table's relation.
#[derive(Clone)]
pub struct Table {
    rel: Relation,
    hidden: bool,
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("relation", &self.rel)
            .field("hidden", &self.hidden)
            .finish()
    }
}

impl Table {
    pub fn new(engine: &Arc<Engine>, source: impl Into<Source>) -> Result<Table> {
        let rel = match source.into() {
            Source::Columns(cols) => engine.load_frame(&Frame::from_columns(cols)?)?,
            Source::Frame(frame) => engine.load_frame(&frame)?,
            Source::Arrow(batch) => engine.load_arrow(&batch)?,
            Source::Relation(rel) => rel,
            Source::Table(table) => return Ok(table),
            Source::Location(location) => {
                debug!(%location, "loading table from file");
                engine.load_file(&location)?
            }
        };
        Ok(Table::from_relation(rel))
    }

    /// Load column-oriented data.
    pub fn from_columns<K, V>(
        engine: &Arc<Engine>,
        columns: impl IntoIterator<Item = (K, Vec<V>)>,
    ) -> Result<Table>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let frame = Frame::from_columns(columns)?;
        Table::new(engine, frame)
    }

    pub fn from_relation(rel: Relation) -> Table {
        Table { rel, hidden: false }
    }

    pub fn relation(&self) -> &Relation {
        &self.rel
    }

    pub fn engine(&self) -> &Arc<Engine> {
        self.rel.engine()
    }

    /// Run a snippet against this table, e.g. `select a + 1 as a` or
    /// `where b > 2`.
    pub fn sql(&self, snippet: &str) -> Result<Table> {
        let name = self.engine().scratch_name();
        let rel = self.rel.query(&name, &format!("from {name} {snippet}"))?;
        Ok(Table::from_relation(rel))
    }

    /// A single-table database holding this table under `name`.
    pub fn alias(&self, name: impl Into<String>) -> Database {
        Database::from_tables(self.engine(), [(name.into(), self.clone())])
    }

    pub fn frame(&self) -> Result<Frame> {
        Ok(self.rel.fetch()?)
    }

    pub fn arrow(&self) -> Result<RecordBatch> {
        Ok(self.rel.to_arrow()?)
    }

    pub fn aslist(&self) -> Result<Vec<Value>> {
        coerce::aslist(&self.frame()?)
    }

    pub fn asitem(&self) -> Result<Value> {
        coerce::asitem(&self.frame()?)
    }

    pub fn asdict(&self) -> Result<IndexMap<String, Value>> {
        coerce::asdict(&self.frame()?)
    }

    pub fn columns(&self) -> Result<Vec<String>> {
        Ok(self.rel.columns()?)
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.rel.count()?)
    }

    /// `<rows> x [<col>, ...]`, or the hidden placeholder.
    pub fn rowcols(&self) -> Result<String> {
        if self.hidden {
            return Ok(HIDDEN_TABLE.to_string());
        }
        let count = self.count()?;
        let columns = self.columns()?;
        Ok(format!("{count} x [{}]", columns.join(", ")))
    }

    /// Write to a csv, parquet or json file depending on the extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        Ok(self.rel.save(path)?)
    }
}

impl Evaluable for Table {
    fn apply_step(&self, step: Step) -> Result<Output> {
        match step {
            Step::Alias { name, .. } => Ok(Output::Database(self.alias(name))),
            Step::Sequence(ops) => self.run(ops),
            Step::Format(format) => Ok(Output::Materialized(self.hold(format)?)),
            Step::Scalar(kind) => coerce::scalar(&self.frame()?, kind),
            Step::List => Ok(Output::List(self.aslist()?)),
            Step::Mapping => Ok(Output::Dict(self.asdict()?)),
            Step::Callable(f) => f(Output::Table(self.clone())),
            Step::SqlText(sql) | Step::FilePath { sql, .. } => Ok(Output::Table(self.sql(&sql)?)),
        }
    }
}

impl Materializable for Table {
    type Materialized = Materialized;

    fn hold(&self, format: Format) -> Result<Materialized> {
        Ok(match format {
            Format::Arrow => Materialized::Arrow(self.arrow()?),
            Format::Pandas => Materialized::Frame(self.frame()?),
        })
    }
}

impl Describable for Table {
    fn render(&self) -> Result<String> {
        if self.hidden {
            return Ok(HIDDEN_TABLE.to_string());
        }

        let config = self.engine().config();
        let total = self.count()?;
        let preview = self.rel.head(config.preview_rows)?.to_record_batch()?;
        arrow_util::pretty::pretty_format_preview(&preview, total, config.max_width)
            .map_err(|e| Error::Engine(e.into()))
    }

    fn is_hidden(&self) -> bool {
        self.hidden
    }

    fn with_hidden(&self, hidden: bool) -> Self {
        Table {
            rel: self.rel.clone(),
            hidden,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Ok(s) => f.write_str(&s),
            Err(e) => write!(f, "<Table error: {e}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Arc<Engine> {
        Engine::open_in_memory().unwrap()
    }

    #[test]
    fn snippet_reads_from_self() {
        let t = Table::from_columns(&engine(), [("a", vec![1, 2, 3])]).unwrap();
        let out = t.sql("where a >= 2").unwrap();
        assert_eq!(2, out.count().unwrap());

        let out = t.sql("select sum(a) as s").unwrap();
        assert_eq!(Value::Integer(6), out.asitem().unwrap());
    }

    #[test]
    fn source_from_table_is_same_relation() {
        let t = Table::from_columns(&engine(), [("a", vec![1])]).unwrap();
        let u = Table::new(t.engine(), t.clone()).unwrap();
        assert!(t.relation().ptr_eq(u.relation()));
    }

    #[test]
    fn rowcols() {
        let t = Table::from_columns(&engine(), [("x", vec![1, 2]), ("y", vec![3, 4])]).unwrap();
        assert_eq!("2 x [x, y]", t.rowcols().unwrap());
        assert_eq!(HIDDEN_TABLE, t.hide().rowcols().unwrap());
    }

    #[test]
    fn render_shows_values() {
        let t = Table::from_columns(&engine(), [("a", vec![0])]).unwrap();
        let out = t.render().unwrap();
        assert!(out.contains('a'), "{out}");
        assert!(out.contains("Int64"), "{out}");
        assert!(out.contains("1 row"), "{out}");
    }

    #[test]
    fn hold_formats() {
        let t = Table::from_columns(&engine(), [("a", vec![1, 2])]).unwrap();
        match t.hold(Format::Arrow).unwrap() {
            Materialized::Arrow(batch) => assert_eq!(2, batch.num_rows()),
            other => panic!("unexpected: {other:?}"),
        }
        match t.hold(Format::Pandas).unwrap() {
            Materialized::Frame(frame) => assert_eq!((2, 1), frame.shape()),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
