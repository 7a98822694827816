//! Per-file SQLite access for the document store.
//!
//! Writers to one database file take that file's mutex, so a document replace
//! (row + tags) never interleaves with another in this process. Readers open
//! their own WAL connection and never wait on the mutex.
//!
//! No connection outlives the closure it was opened for.

use crate::core::db;
use crate::core::error::StoreError;
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

/// Write connection busy_timeout in seconds.
const WRITE_BUSY_TIMEOUT_SECS: u32 = 5;
/// Read connection busy_timeout in seconds.
const READ_BUSY_TIMEOUT_SECS: u32 = 5;

struct PoolEntry {
    write_lock: Mutex<()>,
    db_path: PathBuf,
}

pub struct SqlitePool {
    entries: Mutex<HashMap<PathBuf, Arc<PoolEntry>>>,
}

impl SqlitePool {
    fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn get_entry(&self, db_path: &Path) -> Result<Arc<PoolEntry>, StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::LockPoisoned("sqlite pool entries"))?;
        let entry = entries
            .entry(db_path.to_path_buf())
            .or_insert_with(|| {
                Arc::new(PoolEntry {
                    write_lock: Mutex::new(()),
                    db_path: db_path.to_path_buf(),
                })
            })
            .clone();
        Ok(entry)
    }

    /// Run `f` on a fresh connection while holding the file's write mutex.
    pub fn with_write<F, R>(&self, db_path: &Path, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&Connection) -> Result<R, StoreError>,
    {
        let entry = self.get_entry(db_path)?;
        let _guard = entry
            .write_lock
            .lock()
            .map_err(|_| StoreError::LockPoisoned("sqlite write lock"))?;

        let conn = db::db_connect(&entry.db_path.to_string_lossy(), WRITE_BUSY_TIMEOUT_SECS)?;

        f(&conn)
    }

    /// Run `f` on a fresh connection without taking the write mutex.
    pub fn with_read<F, R>(&self, db_path: &Path, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&Connection) -> Result<R, StoreError>,
    {
        let conn = db::db_connect(&db_path.to_string_lossy(), READ_BUSY_TIMEOUT_SECS)?;

        f(&conn)
    }
}

/// Process-wide pool, shared by every `SqliteStore`.
pub fn global_pool() -> &'static SqlitePool {
    static POOL: OnceLock<SqlitePool> = OnceLock::new();
    POOL.get_or_init(SqlitePool::new)
}
