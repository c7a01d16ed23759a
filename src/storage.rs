//! Record store trait and built-in backends.

use std::io;
use std::path::{Path, PathBuf};

use crate::shop::Shop;

/// File name of the [`FileStore`] document inside its directory.
const STORE_FILE: &str = "shops.json";

/// Embedded persistence for [`Shop`] records.
///
/// The background lane owns its store by value, so every access happens on
/// that lane. Writes take `&mut self` for that reason.
///
/// # Contract
///
/// - [`insert_all`](RecordStore::insert_all) and
///   [`delete_all`](RecordStore::delete_all) are atomic: after an error the
///   persisted set is exactly what it was before the call.
/// - [`query_all`](RecordStore::query_all) returns a snapshot in insertion
///   order.
pub trait RecordStore: Send + 'static {
    /// Append `shops` to the persisted set in a single transaction.
    fn insert_all(&mut self, shops: &[Shop]) -> io::Result<()>;

    /// Return every persisted shop.
    fn query_all(&self) -> io::Result<Vec<Shop>>;

    /// Remove every persisted shop in a single transaction.
    ///
    /// Returns the number of shops removed.
    fn delete_all(&mut self) -> io::Result<usize>;

    /// Where the store keeps its data, if it lives on disk.
    fn location(&self) -> Option<&Path> {
        None
    }
}

/// Volatile store backed by a `Vec`. Useful for tests and demos.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shops: Vec<Shop>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `shops`.
    pub fn with_shops(shops: Vec<Shop>) -> Self {
        Self { shops }
    }
}

impl RecordStore for MemoryStore {
    fn insert_all(&mut self, shops: &[Shop]) -> io::Result<()> {
        self.shops.extend_from_slice(shops);
        Ok(())
    }

    fn query_all(&self) -> io::Result<Vec<Shop>> {
        Ok(self.shops.clone())
    }

    fn delete_all(&mut self) -> io::Result<usize> {
        let removed = self.shops.len();
        self.shops.clear();
        Ok(removed)
    }
}

/// Durable store that keeps the whole set as one JSON document.
///
/// The layout is:
/// ```text
/// <dir>/
///     shops.json        -- JSON array of shops, insertion order
///     shops.json.tmp    -- only present mid-write
/// ```
///
/// Every write rewrites the document to a temp file and renames it over
/// the original, so readers never observe a half-written transaction.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` if the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(STORE_FILE),
        })
    }

    /// Path of the JSON document backing this store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> io::Result<Vec<Shop>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        // Unlike a cache, the canonical set must not be dropped on a bad read.
        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::error!(
                path = %self.path.display(),
                error = %e,
                "record store document is corrupt"
            );
            io::Error::new(io::ErrorKind::InvalidData, e)
        })
    }

    fn commit(&self, shops: &[Shop]) -> io::Result<()> {
        let tmp_path = self.path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(shops)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        std::fs::write(&tmp_path, &json)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl RecordStore for FileStore {
    fn insert_all(&mut self, shops: &[Shop]) -> io::Result<()> {
        let mut all = self.load()?;
        all.extend_from_slice(shops);
        self.commit(&all)
    }

    fn query_all(&self) -> io::Result<Vec<Shop>> {
        self.load()
    }

    fn delete_all(&mut self) -> io::Result<usize> {
        let removed = self.load()?.len();
        self.commit(&[])?;
        Ok(removed)
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn shops(names: &[&str]) -> Vec<Shop> {
        names.iter().map(|n| Shop::new(*n)).collect()
    }

    #[test]
    fn memory_insert_then_query_preserves_order() {
        let mut store = MemoryStore::new();
        store
            .insert_all(&shops(&["b", "a"]))
            .expect("insert should succeed");
        store
            .insert_all(&shops(&["c"]))
            .expect("insert should succeed");

        assert_eq!(store.query_all().expect("query"), shops(&["b", "a", "c"]));
        assert!(store.location().is_none());
    }

    #[test]
    fn memory_delete_all_reports_count() {
        let mut store = MemoryStore::with_shops(shops(&["a", "b"]));
        assert_eq!(store.delete_all().expect("delete"), 2);
        assert!(store.query_all().expect("query").is_empty());
    }

    #[test]
    fn file_store_missing_document_reads_empty() {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let store = FileStore::open(tmp.path()).expect("open should succeed");

        assert!(store.query_all().expect("query").is_empty());
        assert_eq!(store.location(), Some(tmp.path().join("shops.json").as_path()));
    }

    #[test]
    fn file_store_survives_reopen() {
        let tmp = TempDir::new().expect("failed to create temp dir");
        {
            let mut store = FileStore::open(tmp.path()).expect("open should succeed");
            store
                .insert_all(&shops(&["Coffee Shop 1", "Coffee Shop 2"]))
                .expect("insert should succeed");
        }

        let store = FileStore::open(tmp.path()).expect("reopen should succeed");
        assert_eq!(
            store.query_all().expect("query"),
            shops(&["Coffee Shop 1", "Coffee Shop 2"])
        );
    }

    #[test]
    fn file_store_insert_is_additive() {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let mut store = FileStore::open(tmp.path()).expect("open should succeed");

        store.insert_all(&shops(&["a"])).expect("first insert");
        store.insert_all(&shops(&["a", "b"])).expect("second insert");

        // No uniqueness constraint: duplicates are kept.
        assert_eq!(store.query_all().expect("query"), shops(&["a", "a", "b"]));
    }

    #[test]
    fn file_store_delete_then_query_is_empty() {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let mut store = FileStore::open(tmp.path()).expect("open should succeed");
        store.insert_all(&shops(&["a", "b", "c"])).expect("insert");

        assert_eq!(store.delete_all().expect("delete"), 3);
        assert!(store.query_all().expect("query").is_empty());
    }

    #[test]
    fn file_store_write_leaves_no_temp_file() {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let mut store = FileStore::open(tmp.path()).expect("open should succeed");
        store.insert_all(&shops(&["a"])).expect("insert");

        assert!(store.path().exists(), "document should exist");
        assert!(
            !store.path().with_extension("json.tmp").exists(),
            "temp file should not exist after a successful write"
        );
    }

    #[test]
    fn file_store_corrupt_document_is_an_error() {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let mut store = FileStore::open(tmp.path()).expect("open should succeed");
        std::fs::write(store.path(), b"not json at all").expect("write corrupt file");

        let err = store.query_all().expect_err("corrupt document should fail");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        // A failed read must not be turned into an overwrite.
        store
            .insert_all(&shops(&["a"]))
            .expect_err("insert over a corrupt document should fail");
        assert_eq!(
            std::fs::read(store.path()).expect("read back"),
            b"not json at all"
        );
    }
}
