use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::{Error, Result};
use crate::op::{Callable, Coerce, Op};

/// Prefix marking an alias directive, e.g. `as sales`.
const ALIAS_PREFIX: &str = "as ";

/// Materialized representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Arrow record batch.
    Arrow,
    /// Row oriented [`Frame`](sqlwing_engine::Frame).
    Pandas,
}

impl Format {
    pub fn token(&self) -> &'static str {
        match self {
            Format::Arrow => "arrow",
            Format::Pandas => "pandas",
        }
    }

    fn from_token(s: &str) -> Option<Format> {
        match s {
            "arrow" => Some(Format::Arrow),
            "pandas" => Some(Format::Pandas),
            _ => None,
        }
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Format::from_token(s).ok_or_else(|| Error::UnsupportedFormat(s.to_string()))
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Int,
    Str,
    Bool,
    Float,
}

/// A classified step. Dispatch only ever branches on this tag.
#[derive(Clone)]
pub enum Step {
    SqlText(String),
    /// SQL read from a file.
    FilePath { path: PathBuf, sql: String },
    /// `as <name>`. `text` is the full directive.
    Alias { name: String, text: String },
    Format(Format),
    Scalar(ScalarKind),
    List,
    Mapping,
    Sequence(Vec<Op>),
    Callable(Callable),
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::SqlText(sql) => f.debug_tuple("SqlText").field(sql).finish(),
            Step::FilePath { path, .. } => f.debug_struct("FilePath").field("path", path).finish(),
            Step::Alias { name, .. } => f.debug_struct("Alias").field("name", name).finish(),
            Step::Format(format) => f.debug_tuple("Format").field(format).finish(),
            Step::Scalar(kind) => f.debug_tuple("Scalar").field(kind).finish(),
            Step::List => f.write_str("List"),
            Step::Mapping => f.write_str("Mapping"),
            Step::Sequence(ops) => f.debug_tuple("Sequence").field(&ops.len()).finish(),
            Step::Callable(_) => f.write_str("Callable"),
        }
    }
}

impl Step {
    /// Decide what an op means.
    ///
    /// Text naming an existing file is replaced by the file's contents before
    /// anything else is checked, so a file can hold an alias directive or a
    /// format token as well as SQL.
    pub fn classify(op: Op) -> Result<Step> {
        match op {
            Op::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() && Path::new(trimmed).is_file() {
                    let path = PathBuf::from(trimmed);
                    let contents = fs::read_to_string(&path)?;
                    Self::classify_text(contents, Some(path))
                } else {
                    Self::classify_text(text, None)
                }
            }
            Op::Path(path) => {
                let contents = fs::read_to_string(&path)?;
                Self::classify_text(contents, Some(path))
            }
            Op::Seq(ops) => Ok(Step::Sequence(ops)),
            Op::Coerce(coerce) => Ok(match coerce {
                Coerce::Int => Step::Scalar(ScalarKind::Int),
                Coerce::Str => Step::Scalar(ScalarKind::Str),
                Coerce::Bool => Step::Scalar(ScalarKind::Bool),
                Coerce::Float => Step::Scalar(ScalarKind::Float),
                Coerce::List => Step::List,
                Coerce::Dict => Step::Mapping,
            }),
            Op::Call(f) => Ok(Step::Callable(f)),
        }
    }

    fn classify_text(text: String, path: Option<PathBuf>) -> Result<Step> {
        // Anything starting with "as " is an alias, including SQL that merely
        // happens to start that way.
        if let Some(rest) = text.trim_start().strip_prefix(ALIAS_PREFIX) {
            let name = rest.trim();
            if name.is_empty() {
                return Err(Error::EmptyAlias(text.trim().to_string()));
            }
            return Ok(Step::Alias {
                name: name.to_string(),
                text,
            });
        }

        if let Some(format) = Format::from_token(text.trim()) {
            return Ok(Step::Format(format));
        }

        Ok(match path {
            Some(path) => Step::FilePath { path, sql: text },
            None => Step::SqlText(text),
        })
    }

    /// Short name used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Step::SqlText(_) => "sql",
            Step::FilePath { .. } => "sql file",
            Step::Alias { .. } => "alias",
            Step::Format(_) => "format",
            Step::Scalar(ScalarKind::Int) => "int",
            Step::Scalar(ScalarKind::Str) => "str",
            Step::Scalar(ScalarKind::Bool) => "bool",
            Step::Scalar(ScalarKind::Float) => "float",
            Step::List => "list",
            Step::Mapping => "dict",
            Step::Sequence(_) => "sequence",
            Step::Callable(_) => "callable",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn classify(op: impl Into<Op>) -> Step {
        Step::classify(op.into()).unwrap()
    }

    #[test]
    fn sql_text() {
        match classify("select a + 1 as a") {
            Step::SqlText(sql) => assert_eq!("select a + 1 as a", sql),
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[test]
    fn alias() {
        match classify("  as bah ") {
            Step::Alias { name, .. } => assert_eq!("bah", name),
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[test]
    fn alias_without_name() {
        for text in ["as   ", " as \n"] {
            let err = Step::classify(Op::from(text)).unwrap_err();
            assert!(matches!(err, Error::EmptyAlias(_)), "{text:?}: {err}");
        }
    }

    #[test]
    fn alias_is_case_sensitive() {
        assert!(matches!(classify("AS bah"), Step::SqlText(_)));
        assert!(matches!(classify("ascending"), Step::SqlText(_)));
    }

    #[test]
    fn alias_prefix_misfires_on_sql() {
        // Known ambiguity, SQL starting with "as " is taken as an alias.
        assert!(matches!(classify("as x select 1"), Step::Alias { .. }));
    }

    #[test]
    fn format_tokens() {
        assert!(matches!(classify("arrow"), Step::Format(Format::Arrow)));
        assert!(matches!(classify(" pandas\n"), Step::Format(Format::Pandas)));
        assert!(matches!(classify("polars"), Step::SqlText(_)));
    }

    #[test]
    fn coercions() {
        assert!(matches!(
            classify(Coerce::Int),
            Step::Scalar(ScalarKind::Int)
        ));
        assert!(matches!(classify(Coerce::List), Step::List));
        assert!(matches!(classify(Coerce::Dict), Step::Mapping));
    }

    #[test]
    fn sequence_and_callable() {
        assert!(matches!(classify(["a", "b"]), Step::Sequence(ops) if ops.len() == 2));
        assert!(matches!(classify(Op::call(Ok)), Step::Callable(_)));
    }

    #[test]
    fn text_naming_a_file_reads_it() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "select 42 as x").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        match classify(format!(" {path} ")) {
            Step::FilePath { sql, .. } => assert_eq!("select 42 as x", sql),
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[test]
    fn file_holding_alias() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "as from_file").unwrap();

        match classify(file.path()) {
            Step::Alias { name, .. } => assert_eq!("from_file", name),
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[test]
    fn missing_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = Step::classify(Op::from(dir.path().join("nope.sql"))).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn parse_format() {
        assert_eq!(Format::Arrow, "arrow".parse::<Format>().unwrap());
        let err = "polars".parse::<Format>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }
}
