//! SQLite-backed [`DocumentStore`].
//!
//! Writes replace the document row and its tag rows inside one transaction, so a
//! reader on another connection sees either the old pair or the new pair.

use crate::core::db;
use crate::core::error::StoreError;
use crate::core::pool;
use crate::core::store::{
    CollectionMatch, CollectionPage, CollectionQuery, DocumentStore, Location, StoredDocument,
    TagSet, content_hash, content_matches,
};
use crate::core::time;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::path::{Path, PathBuf};

pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open (and if needed initialize) the database at `db_path`.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref().to_path_buf();
        db::initialize_document_db(&db_path)?;
        Ok(Self { db_path })
    }
}

fn load_tags(conn: &Connection, location: &str) -> Result<TagSet, StoreError> {
    let mut stmt =
        conn.prepare("SELECT tag FROM document_tags WHERE location = ?1 ORDER BY tag")?;
    let rows = stmt.query_map(params![location], |row| row.get::<_, String>(0))?;
    let mut tags = TagSet::new();
    for tag in rows {
        tags.insert(tag?);
    }
    Ok(tags)
}

/// Register `content_matches(content, text)` on `conn`. Content is matched as raw
/// bytes, so embedded NULs do not cut the search short.
fn register_content_matches(conn: &Connection) -> Result<(), StoreError> {
    conn.create_scalar_function(
        "content_matches",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let content = match ctx.get_raw(0) {
                ValueRef::Blob(bytes) | ValueRef::Text(bytes) => bytes,
                _ => b"".as_slice(),
            };
            let text: String = ctx.get(1)?;
            Ok(content_matches(content, &text))
        },
    )?;
    Ok(())
}

impl DocumentStore for SqliteStore {
    fn write_document(
        &self,
        location: &Location,
        tags: &TagSet,
        content: &[u8],
        content_type: &str,
    ) -> Result<(), StoreError> {
        let hash = content_hash(content);
        let now = time::now_epoch_z();

        pool::global_pool().with_write(&self.db_path, |conn| {
            let tx = conn.unchecked_transaction()?;
            let current = tx
                .query_row(
                    "SELECT content_hash, content_type FROM documents WHERE location = ?1",
                    params![location.as_str()],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                )
                .optional()?;
            if let Some((current_hash, current_type)) = current
                && current_hash == hash
                && current_type == content_type
                && load_tags(&tx, location.as_str())? == *tags
            {
                return Ok(());
            }
            tx.execute(
                "INSERT INTO documents(location, content, content_type, content_hash, created, last_modified)
                 VALUES(?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(location) DO UPDATE SET
                    content = excluded.content,
                    content_type = excluded.content_type,
                    content_hash = excluded.content_hash,
                    last_modified = excluded.last_modified",
                params![location.as_str(), content, content_type, hash, now],
            )?;
            tx.execute(
                "DELETE FROM document_tags WHERE location = ?1",
                params![location.as_str()],
            )?;
            {
                let mut stmt =
                    tx.prepare("INSERT INTO document_tags(location, tag) VALUES(?1, ?2)")?;
                for tag in tags.iter() {
                    stmt.execute(params![location.as_str(), tag])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn read_document(&self, location: &Location) -> Result<Option<StoredDocument>, StoreError> {
        pool::global_pool().with_read(&self.db_path, |conn| {
            let row = conn
                .query_row(
                    "SELECT content, content_type, content_hash, created, last_modified
                     FROM documents WHERE location = ?1",
                    params![location.as_str()],
                    |row| {
                        Ok((
                            row.get::<_, Vec<u8>>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                        ))
                    },
                )
                .optional()?;

            let Some((content, content_type, content_hash, created, last_modified)) = row else {
                return Ok(None);
            };
            let tags = load_tags(conn, location.as_str())?;

            Ok(Some(StoredDocument {
                location: location.clone(),
                content,
                content_type,
                content_hash,
                tags,
                created,
                last_modified,
            }))
        })
    }

    fn delete_document(&self, location: &Location) -> Result<bool, StoreError> {
        pool::global_pool().with_write(&self.db_path, |conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "DELETE FROM document_tags WHERE location = ?1",
                params![location.as_str()],
            )?;
            let removed = tx.execute(
                "DELETE FROM documents WHERE location = ?1",
                params![location.as_str()],
            )?;
            tx.commit()?;
            Ok(removed > 0)
        })
    }

    fn query_by_collection(
        &self,
        tags: &TagSet,
        query: &CollectionQuery,
    ) -> Result<CollectionPage, StoreError> {
        if tags.is_empty() || query.limit == 0 {
            return Ok(CollectionPage::default());
        }

        let tag_count = tags.len();
        let placeholders = (1..=tag_count)
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let text_param = tag_count + 1;
        let filter = format!(
            "d.location IN (
                SELECT location FROM document_tags WHERE tag IN ({placeholders})
                GROUP BY location HAVING COUNT(DISTINCT tag) = {tag_count}
             )
             AND content_matches(d.content, ?{text_param})"
        );

        let mut values: Vec<Value> = tags.iter().map(|t| Value::Text(t.to_string())).collect();
        values.push(Value::Text(query.text.clone()));

        pool::global_pool().with_read(&self.db_path, |conn| {
            register_content_matches(conn)?;
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM documents d WHERE {filter}"),
                params_from_iter(values.iter()),
                |row| row.get(0),
            )?;

            let mut paged = values.clone();
            paged.push(Value::Integer(i64::try_from(query.limit).unwrap_or(i64::MAX)));
            paged.push(Value::Integer(i64::try_from(query.offset).unwrap_or(i64::MAX)));

            let mut stmt = conn.prepare(&format!(
                "SELECT d.location, d.content_type, d.created, d.last_modified
                 FROM documents d WHERE {filter}
                 ORDER BY d.last_modified DESC, d.location ASC
                 LIMIT ?{} OFFSET ?{}",
                text_param + 1,
                text_param + 2
            ))?;
            let rows = stmt.query_map(params_from_iter(paged.iter()), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?;

            let mut matches = Vec::new();
            for row in rows {
                let (location, content_type, created, last_modified) = row?;
                let tags = load_tags(conn, &location)?;
                matches.push(CollectionMatch {
                    location: Location::new(location),
                    tags,
                    content_type,
                    created,
                    last_modified,
                });
            }

            Ok(CollectionPage {
                total: u64::try_from(total).unwrap_or_default(),
                matches,
            })
        })
    }
}
