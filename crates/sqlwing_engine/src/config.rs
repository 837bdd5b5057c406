use std::path::PathBuf;

use derive_builder::Builder;

/// Default number of rows shown when rendering a table.
pub const DEFAULT_PREVIEW_ROWS: usize = 20;

/// Default number of csv/json records read to infer a schema.
pub const DEFAULT_INFER_RECORDS: usize = 1000;

/// Options for opening an [`Engine`](crate::Engine).
///
/// ```
/// use sqlwing_engine::EngineConfigBuilder;
///
/// let config = EngineConfigBuilder::default()
///     .init_statement("pragma case_sensitive_like = true")
///     .preview_rows(5_usize)
///     .build()
///     .unwrap();
/// assert!(config.path.is_none());
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(default)]
pub struct EngineConfig {
    /// Database file to open. In-memory when unset.
    #[builder(setter(into, strip_option))]
    pub path: Option<PathBuf>,

    /// Statements run once, right after the connection is opened.
    #[builder(setter(custom))]
    pub init_statements: Vec<String>,

    /// Max number of rows fetched when rendering a table.
    #[builder(setter(into))]
    pub preview_rows: usize,

    /// Max width for rendered tables. Unbounded when unset.
    #[builder(setter(into, strip_option))]
    pub max_width: Option<usize>,

    /// Number of records sampled when inferring csv and json schemas.
    #[builder(setter(into))]
    pub infer_records: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            path: None,
            init_statements: Vec::new(),
            preview_rows: DEFAULT_PREVIEW_ROWS,
            max_width: None,
            infer_records: DEFAULT_INFER_RECORDS,
        }
    }
}

impl EngineConfigBuilder {
    pub fn init_statement(&mut self, stmt: impl Into<String>) -> &mut Self {
        self.init_statements
            .get_or_insert_with(Vec::new)
            .push(stmt.into());
        self
    }
}
