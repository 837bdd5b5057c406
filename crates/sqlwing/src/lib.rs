//! Chainable tables and databases over an embedded SQL engine.
//!
//! A [`Table`] wraps one relation, a [`Database`] a set of named tables. Both
//! accept chains of [`Op`]s: SQL snippets, files of SQL, `as <name>` aliases,
//! the `arrow`/`pandas` format tokens, [`Coerce`] markers and callables. Each
//! op is applied to the result of the previous one.
//!
//! ```
//! use sqlwing::{Coerce, Engine, Evaluable, Table, Value, ops};
//!
//! let engine = Engine::open_in_memory().unwrap();
//! let t = Table::from_columns(&engine, [("a", vec![Value::from(0)])]).unwrap();
//!
//! let db = t.run(ops!["select a + 1 as a", "as counts"]).unwrap();
//! let n = db.run(ops!["select a from counts", Coerce::Int]).unwrap();
//! assert_eq!(Some(1), n.as_int());
//! ```

pub mod coerce;
pub mod database;
pub mod dispatch;
pub mod errors;
pub mod op;
pub mod output;
pub mod step;
pub mod table;

pub use coerce::Materialized;
pub use database::Database;
pub use dispatch::{Describable, Evaluable, Materializable, run, run_database};
pub use errors::{Error, Result};
pub use op::{Callable, Coerce, Op};
pub use output::Output;
pub use sqlwing_engine::{Engine, EngineConfig, EngineConfigBuilder, Frame, Relation, Value};
pub use step::{Format, ScalarKind, Step};
pub use table::{Source, Table};
