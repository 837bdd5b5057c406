//! Capabilities shared by tables and databases.

use std::sync::Arc;

use sqlwing_engine::Engine;

use crate::database::Database;
use crate::errors::Result;
use crate::op::Op;
use crate::output::Output;
use crate::step::{Format, Step};
use crate::table::Source;

/// Evaluate a chain of ops starting from `carrier`.
///
/// ```
/// use sqlwing::{Coerce, Engine, Table, Value, ops};
///
/// let engine = Engine::open_in_memory().unwrap();
/// let table = Table::from_columns(&engine, [("a", vec![Value::from(0)])]).unwrap();
///
/// let f = "select a + 1 as a";
/// let out = sqlwing::run(table, ops![f, f, Coerce::Int]).unwrap();
/// assert_eq!(Some(2), out.as_int());
/// ```
pub fn run<I>(carrier: impl Into<Output>, ops: I) -> Result<Output>
where
    I: IntoIterator,
    I::Item: Into<Op>,
{
    carrier.into().run(ops)
}

/// Evaluate a chain of ops against a database built from named sources.
///
/// ```
/// use sqlwing::{Coerce, Engine, Table, Value, ops};
///
/// let engine = Engine::open_in_memory().unwrap();
/// let a = Table::from_columns(&engine, [("x", vec![Value::from(1), Value::from(2)])]).unwrap();
/// let ops = ops!["select sum(x) from a", Coerce::Int];
/// let out = sqlwing::run_database(&engine, [("a", a)], ops).unwrap();
/// assert_eq!(Some(3), out.as_int());
/// ```
pub fn run_database<S, K, V, I>(engine: &Arc<Engine>, sources: S, ops: I) -> Result<Output>
where
    S: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Source>,
    I: IntoIterator,
    I::Item: Into<Op>,
{
    run(Database::new(engine, sources)?, ops)
}

/// Values that steps can be applied to.
pub trait Evaluable: Clone + Into<Output> {
    /// Apply one classified step.
    fn apply_step(&self, step: Step) -> Result<Output>;

    /// Apply `ops` left to right, starting from this value.
    fn run<I>(&self, ops: I) -> Result<Output>
    where
        I: IntoIterator,
        I::Item: Into<Op>,
    {
        run(self.clone(), ops)
    }
}

/// Values that can be pulled into memory.
pub trait Materializable {
    type Materialized;

    fn hold(&self, format: Format) -> Result<Self::Materialized>;
}

/// Text rendering with a hide/show switch.
///
/// Rendering a hidden value never queries the engine.
pub trait Describable: Sized {
    fn render(&self) -> Result<String>;

    fn is_hidden(&self) -> bool;

    fn with_hidden(&self, hidden: bool) -> Self;

    fn hide(&self) -> Self {
        self.with_hidden(true)
    }

    fn show(&self) -> Self {
        self.with_hidden(false)
    }
}
