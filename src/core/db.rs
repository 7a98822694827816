use crate::core::error::StoreError;
use crate::core::pool;
use crate::core::schemas;
use rusqlite::Connection;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub fn db_connect(db_path: &str, busy_timeout_secs: u32) -> Result<Connection, StoreError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(Duration::from_secs(u64::from(busy_timeout_secs)))?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;
    conn.execute("PRAGMA foreign_keys=ON;", [])?;
    Ok(conn)
}

/// Create the document tables if missing. Safe to call on every startup.
pub fn initialize_document_db(db_path: &Path) -> Result<(), StoreError> {
    if let Some(parent_dir) = db_path.parent()
        && !parent_dir.as_os_str().is_empty()
    {
        fs::create_dir_all(parent_dir)?;
    }

    pool::global_pool().with_write(db_path, |conn| {
        for statement in schemas::document_db_schema() {
            conn.execute(statement, [])?;
        }
        Ok(())
    })?;

    tracing::debug!(target: "formgate::store", path = %db_path.display(), "document database ready");
    Ok(())
}
