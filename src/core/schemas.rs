//! SQL schema for the SQLite document store.
//!
//! One database file holds every document the gateway writes:
//! `documents` keyed by location, and `document_tags` holding the collection
//! tags for each location.

pub const DOCUMENT_DB_NAME: &str = "formgate.db";

pub const DOCUMENT_DB_SCHEMA_DOCUMENTS: &str = "
    CREATE TABLE IF NOT EXISTS documents (
        location TEXT PRIMARY KEY,
        content BLOB NOT NULL,
        content_type TEXT NOT NULL,
        content_hash TEXT NOT NULL,
        created TEXT NOT NULL,
        last_modified TEXT NOT NULL
    )
";

pub const DOCUMENT_DB_SCHEMA_TAGS: &str = "
    CREATE TABLE IF NOT EXISTS document_tags (
        location TEXT NOT NULL,
        tag TEXT NOT NULL,
        PRIMARY KEY (location, tag),
        FOREIGN KEY(location) REFERENCES documents(location) ON DELETE CASCADE
    )
";

pub const DOCUMENT_DB_SCHEMA_TAG_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_document_tags_tag ON document_tags(tag)";

pub const DOCUMENT_DB_SCHEMA_MODIFIED_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_documents_modified ON documents(last_modified)";

pub fn document_db_schema() -> [&'static str; 4] {
    [
        DOCUMENT_DB_SCHEMA_DOCUMENTS,
        DOCUMENT_DB_SCHEMA_TAGS,
        DOCUMENT_DB_SCHEMA_TAG_INDEX,
        DOCUMENT_DB_SCHEMA_MODIFIED_INDEX,
    ]
}
