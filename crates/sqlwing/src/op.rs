//! Caller-facing chain steps.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::Result;
use crate::output::Output;

/// A function applied to the current carrier. Its return value becomes the
/// next carrier.
pub type Callable = Arc<dyn Fn(Output) -> Result<Output> + Send + Sync>;

/// Coercion markers, terminal steps converting a result to a plain value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coerce {
    Int,
    Str,
    Bool,
    Float,
    List,
    Dict,
}

impl Coerce {
    pub fn name(&self) -> &'static str {
        match self {
            Coerce::Int => "int",
            Coerce::Str => "str",
            Coerce::Bool => "bool",
            Coerce::Float => "float",
            Coerce::List => "list",
            Coerce::Dict => "dict",
        }
    }
}

/// One step of a chain, as passed in by a caller.
///
/// Use [`ops!`](crate::ops) to build a chain out of mixed values:
///
/// ```
/// use sqlwing::{Coerce, Op, ops};
///
/// let f = "select a + 1 as a";
/// let chain: Vec<Op> = ops![f, [f, f], Coerce::Int];
/// assert_eq!(3, chain.len());
/// ```
#[derive(Clone)]
pub enum Op {
    /// SQL, a path to a file of SQL, an `as <name>` alias or a format token.
    Text(String),
    /// File whose contents are used as the step's text.
    Path(PathBuf),
    /// Steps spliced into the chain in place.
    Seq(Vec<Op>),
    Coerce(Coerce),
    Call(Callable),
}

impl Op {
    /// Wrap a closure as a step.
    pub fn call<F>(f: F) -> Op
    where
        F: Fn(Output) -> Result<Output> + Send + Sync + 'static,
    {
        Op::Call(Arc::new(f))
    }
}

impl fmt::Debug for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Op::Path(p) => f.debug_tuple("Path").field(p).finish(),
            Op::Seq(ops) => f.debug_tuple("Seq").field(ops).finish(),
            Op::Coerce(c) => f.debug_tuple("Coerce").field(c).finish(),
            Op::Call(_) => f.write_str("Call(..)"),
        }
    }
}

impl From<&str> for Op {
    fn from(s: &str) -> Self {
        Op::Text(s.to_string())
    }
}

impl From<String> for Op {
    fn from(s: String) -> Self {
        Op::Text(s)
    }
}

impl From<&String> for Op {
    fn from(s: &String) -> Self {
        Op::Text(s.clone())
    }
}

impl From<&Path> for Op {
    fn from(p: &Path) -> Self {
        Op::Path(p.to_path_buf())
    }
}

impl From<PathBuf> for Op {
    fn from(p: PathBuf) -> Self {
        Op::Path(p)
    }
}

impl From<Coerce> for Op {
    fn from(c: Coerce) -> Self {
        Op::Coerce(c)
    }
}

impl From<Callable> for Op {
    fn from(f: Callable) -> Self {
        Op::Call(f)
    }
}

impl<T: Into<Op>> From<Vec<T>> for Op {
    fn from(ops: Vec<T>) -> Self {
        Op::Seq(ops.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Op>, const N: usize> From<[T; N]> for Op {
    fn from(ops: [T; N]) -> Self {
        Op::Seq(ops.into_iter().map(Into::into).collect())
    }
}

/// Build a `Vec<Op>` from values convertible into [`Op`].
#[macro_export]
macro_rules! ops {
    ($($op:expr),* $(,)?) => {
        ::std::vec![$($crate::Op::from($op)),*]
    };
}
