use std::fmt;
use std::path::Path;
use std::sync::Arc;

use arrow::record_batch::RecordBatch;

use crate::engine::Engine;
use crate::errors::Result;
use crate::frame::Frame;
use crate::io::write_file;

struct RelationInner {
    engine: Arc<Engine>,
    storage: String,
}

impl Drop for RelationInner {
    fn drop(&mut self) {
        self.engine.release(std::mem::take(&mut self.storage));
    }
}

/// Handle to an immutable result set owned by the engine.
///
/// Clones share the same storage, which is released once the last clone is
/// dropped.
#[derive(Clone)]
pub struct Relation {
    inner: Arc<RelationInner>,
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Relation").field(&self.inner.storage).finish()
    }
}

impl Relation {
    pub(crate) fn new(engine: Arc<Engine>, storage: String) -> Self {
        Relation {
            inner: Arc::new(RelationInner { engine, storage }),
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.inner.engine
    }

    /// Name of the table holding this relation's rows.
    pub fn storage_name(&self) -> &str {
        &self.inner.storage
    }

    /// Whether both handles refer to the same storage.
    pub fn ptr_eq(&self, other: &Relation) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Run `sql` with this relation visible as `name`.
    pub fn query(&self, name: &str, sql: &str) -> Result<Relation> {
        self.inner.engine.query(sql, &[(name, self)])
    }

    pub fn fetch(&self) -> Result<Frame> {
        self.inner.engine.fetch(&self.inner.storage, None)
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> Result<Frame> {
        self.inner.engine.fetch(&self.inner.storage, Some(n))
    }

    pub fn count(&self) -> Result<usize> {
        self.inner.engine.count(&self.inner.storage)
    }

    pub fn columns(&self) -> Result<Vec<String>> {
        self.inner.engine.columns(&self.inner.storage)
    }

    pub fn to_arrow(&self) -> Result<RecordBatch> {
        self.fetch()?.to_record_batch()
    }

    /// Write every row to `path`, formatted by extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        // Check the extension before reading any rows.
        crate::io::FileFormat::from_path(path)?;
        write_file(path, &self.to_arrow()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EngineError;
    use crate::value::Value;

    #[test]
    fn clones_share_storage() {
        let engine = Engine::open_in_memory().unwrap();
        let rel = engine
            .load_frame(&Frame::from_columns([("a", vec![1])]).unwrap())
            .unwrap();
        let other = rel.clone();
        assert!(rel.ptr_eq(&other));
        assert_eq!(rel.storage_name(), other.storage_name());

        drop(rel);
        assert_eq!(1, other.count().unwrap());
    }

    #[test]
    fn head_limits_rows() {
        let engine = Engine::open_in_memory().unwrap();
        let rel = engine
            .load_frame(&Frame::from_columns([("a", (0..30).collect::<Vec<_>>())]).unwrap())
            .unwrap();
        let head = rel.head(5).unwrap();
        assert_eq!((5, 1), head.shape());
        assert_eq!(Some(&Value::Integer(4)), head.iloc(4, 0));
    }

    #[test]
    fn query_under_name() {
        let engine = Engine::open_in_memory().unwrap();
        let rel = engine
            .load_frame(&Frame::from_columns([("a", vec![1, 2, 3])]).unwrap())
            .unwrap();
        let out = rel.query("x", "from x where a > 1").unwrap();
        assert_eq!(2, out.count().unwrap());
    }

    #[test]
    fn save_unknown_extension() {
        let engine = Engine::open_in_memory().unwrap();
        let rel = engine
            .load_frame(&Frame::from_columns([("a", vec![1])]).unwrap())
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = rel.save(dir.path().join("out.xlsx")).unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedFormat(_)));
    }
}
