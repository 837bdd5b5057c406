use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::{debug, trace, warn};

use crate::config::EngineConfig;
use crate::convert::{array_values, sqlite_decl_type};
use crate::dialect::{bind_relations, quote_ident, rewrite_from_first};
use crate::errors::{EngineError, Result, internal};
use crate::frame::{Column, Frame};
use crate::io::{read_file, resolve_location};
use crate::names::NameGenerator;
use crate::relation::Relation;
use crate::value::Value;

/// Embedded SQL engine context.
///
/// Owns the connection and every relation created through it. Relations hold
/// an `Arc` back to the engine, so the engine stays alive as long as any
/// relation does.
pub struct Engine {
    conn: Mutex<Connection>,
    config: EngineConfig,
    /// Names callers bind relations under when re-querying them.
    scratch_names: NameGenerator,
    /// Names of the temp tables backing relations.
    storage_names: NameGenerator,
    /// Storage of dropped relations, cleaned up on the next engine call.
    released: Mutex<Vec<String>>,
    statements: AtomicU64,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.config.path {
            Some(path) => write!(f, "Engine({})", path.to_string_lossy()),
            None => write!(f, "Engine(:memory:)"),
        }
    }
}

impl Engine {
    /// Open a connection and run the configured init statements.
    pub fn open(config: EngineConfig) -> Result<Arc<Engine>> {
        let conn = match &config.path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };

        for stmt in &config.init_statements {
            debug!(%stmt, "running init statement");
            conn.execute_batch(stmt)?;
        }

        Ok(Arc::new(Engine {
            conn: Mutex::new(conn),
            config,
            scratch_names: NameGenerator::new("_tbl_"),
            storage_names: NameGenerator::new("_rel_"),
            released: Mutex::new(Vec::new()),
            statements: AtomicU64::new(0),
        }))
    }

    pub fn open_in_memory() -> Result<Arc<Engine>> {
        Self::open(EngineConfig::default())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of statements run on behalf of callers so far.
    ///
    /// Init statements and storage cleanup are not counted.
    pub fn query_count(&self) -> u64 {
        self.statements.load(Ordering::Relaxed)
    }

    /// A fresh name for binding a relation in a query.
    pub fn scratch_name(&self) -> String {
        self.scratch_names.next_name()
    }

    /// Run a query with `bindings` visible under their names, storing the
    /// result as a new relation.
    ///
    /// `sql` may use the `FROM`-first shorthand.
    pub fn query(self: &Arc<Self>, sql: &str, bindings: &[(&str, &Relation)]) -> Result<Relation> {
        let rewritten = rewrite_from_first(sql)?;
        let bindings: Vec<(&str, &str)> = bindings
            .iter()
            .map(|(name, rel)| (*name, rel.storage_name()))
            .collect();
        let bound = bind_relations(&rewritten, &bindings)?;

        let storage = self.storage_names.next_name();
        let create = format!("CREATE TEMP TABLE {} AS {bound}", quote_ident(&storage));
        trace!(%create, "rewritten query");

        self.with_conn(|conn| {
            self.count_statement(sql);
            conn.execute(&create, [])?;
            Ok(())
        })?;

        Ok(Relation::new(self.clone(), storage))
    }

    /// Store a frame as a new relation.
    pub fn load_frame(self: &Arc<Self>, frame: &Frame) -> Result<Relation> {
        let schema = frame.schema();
        self.create_relation(&schema, frame.rows.iter().cloned())
    }

    /// Store an arrow batch as a new relation.
    pub fn load_arrow(self: &Arc<Self>, batch: &RecordBatch) -> Result<Relation> {
        self.load_batches(&batch.schema(), std::slice::from_ref(batch))
    }

    pub fn load_batches(
        self: &Arc<Self>,
        schema: &SchemaRef,
        batches: &[RecordBatch],
    ) -> Result<Relation> {
        let mut rows = Vec::new();
        for batch in batches {
            if batch.num_columns() != schema.fields().len() {
                return Err(internal!(
                    "batch has {} columns, schema has {}",
                    batch.num_columns(),
                    schema.fields().len()
                ));
            }

            let columns = batch
                .columns()
                .iter()
                .map(|col| array_values(col.as_ref()))
                .collect::<Result<Vec<_>>>()?;
            let mut iters: Vec<_> = columns.into_iter().map(|c| c.into_iter()).collect();
            for _ in 0..batch.num_rows() {
                rows.push(
                    iters
                        .iter_mut()
                        .map(|it| it.next().unwrap_or(Value::Null))
                        .collect::<Vec<_>>(),
                );
            }
        }

        self.create_relation(schema, rows)
    }

    /// Load a csv, tsv, parquet or json file, given as a path or `file://` url.
    pub fn load_file(self: &Arc<Self>, location: &str) -> Result<Relation> {
        let path = resolve_location(location)?;
        self.load_path(&path)
    }

    pub fn load_path(self: &Arc<Self>, path: &Path) -> Result<Relation> {
        let (schema, batches) = read_file(path, self.config.infer_records)?;
        debug!(path = %path.display(), batches = batches.len(), "loaded file");
        self.load_batches(&schema, &batches)
    }

    fn create_relation(
        self: &Arc<Self>,
        schema: &SchemaRef,
        rows: impl IntoIterator<Item = Vec<Value>>,
    ) -> Result<Relation> {
        if schema.fields().is_empty() {
            return Err(EngineError::NoColumns);
        }

        let storage = self.storage_names.next_name();
        let defs = schema
            .fields()
            .iter()
            .map(|f| format!("{} {}", quote_ident(f.name()), sqlite_decl_type(f.data_type())))
            .collect::<Vec<_>>()
            .join(", ");
        let create = format!("CREATE TEMP TABLE {} ({defs})", quote_ident(&storage));

        let params = vec!["?"; schema.fields().len()].join(", ");
        let insert = format!("INSERT INTO {} VALUES ({params})", quote_ident(&storage));

        self.with_conn(|conn| {
            self.count_statement(&create);
            let tx = conn.unchecked_transaction()?;
            tx.execute(&create, [])?;
            {
                let mut stmt = tx.prepare(&insert)?;
                for row in rows {
                    stmt.execute(rusqlite::params_from_iter(row.iter()))?;
                }
            }
            tx.commit()?;
            Ok(())
        })?;

        Ok(Relation::new(self.clone(), storage))
    }

    /// Read rows of a stored relation, at most `limit` when set.
    pub(crate) fn fetch(&self, storage: &str, limit: Option<usize>) -> Result<Frame> {
        let sql = match limit {
            Some(n) => format!("SELECT * FROM {} LIMIT {n}", quote_ident(storage)),
            None => format!("SELECT * FROM {}", quote_ident(storage)),
        };

        self.with_conn(|conn| {
            self.count_statement(&sql);
            let mut stmt = conn.prepare(&sql)?;
            let columns = stmt
                .columns()
                .into_iter()
                .map(Column::from)
                .collect::<Vec<_>>();
            let num_cols = columns.len();

            let rows = stmt
                .query([])?
                .mapped(|r| {
                    (0..num_cols)
                        .map(|idx| Ok(Value::from(r.get_ref(idx)?)))
                        .collect::<Result<Vec<_>, rusqlite::Error>>()
                })
                .collect::<Result<Vec<_>, rusqlite::Error>>()?;

            Ok(Frame::new(columns, rows))
        })
    }

    pub(crate) fn count(&self, storage: &str) -> Result<usize> {
        let sql = format!("SELECT count(*) FROM {}", quote_ident(storage));
        self.with_conn(|conn| {
            self.count_statement(&sql);
            let n: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
            Ok(n as usize)
        })
    }

    pub(crate) fn columns(&self, storage: &str) -> Result<Vec<String>> {
        let sql = format!("SELECT * FROM {} LIMIT 0", quote_ident(storage));
        self.with_conn(|conn| {
            self.count_statement(&sql);
            let stmt = conn.prepare(&sql)?;
            Ok(stmt.column_names().into_iter().map(String::from).collect())
        })
    }

    /// Queue a relation's storage for removal.
    ///
    /// Never takes the connection lock, so it is safe to call from a drop.
    pub(crate) fn release(&self, storage: String) {
        self.released.lock().push(storage);
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock();

        let released = std::mem::take(&mut *self.released.lock());
        for storage in released {
            let drop = format!("DROP TABLE IF EXISTS temp.{}", quote_ident(&storage));
            if let Err(e) = conn.execute(&drop, []) {
                warn!(%e, %storage, "failed to release relation storage");
            }
        }

        f(&conn)
    }

    fn count_statement(&self, sql: &str) {
        let n = self.statements.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(statement = n, %sql, "executing");
    }
}
