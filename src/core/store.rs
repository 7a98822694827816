//! Document Store capability.
//!
//! The gateway never touches storage internals. Everything it persists goes through
//! [`DocumentStore`]: a location-keyed document space where each document carries a
//! set of collection tags used for grouped lookup and scoped search.
//!
//! Two backends ship with the crate:
//! - [`SqliteStore`](crate::core::sqlite::SqliteStore): durable, WAL-mode SQLite file
//! - [`MemoryStore`](crate::core::memory::MemoryStore): in-process, for tests and throwaway runs

use crate::core::error::StoreError;
use serde::{Deserialize, Serialize};
use sha2::Digest;
use std::collections::BTreeSet;
use std::fmt;

/// Backend discriminator selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// SQLite database file on local disk.
    #[default]
    Sqlite,
    /// Process-local map; contents vanish on exit.
    Memory,
}

/// Stable document URI inside the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Location(String);

impl Location {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unordered set of collection tags. Iteration order is sorted, so output is stable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct TagSet(BTreeSet<String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: impl Into<String>) {
        self.0.insert(tag.into());
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    /// True when every tag of `self` is also present in `other`.
    pub fn is_subset(&self, other: &TagSet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A document as held by the store, with its write-time metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub location: Location,
    pub content: Vec<u8>,
    pub content_type: String,
    /// Hex SHA-256 of `content`.
    pub content_hash: String,
    pub tags: TagSet,
    /// Set on first write, preserved by later overwrites.
    pub created: String,
    pub last_modified: String,
}

impl StoredDocument {
    /// True when a write of `hash`, `content_type` and `tags` would change nothing.
    pub fn is_same_version(&self, hash: &str, content_type: &str, tags: &TagSet) -> bool {
        self.content_hash == hash && self.content_type == content_type && self.tags == *tags
    }
}

/// Parameters of a collection-scoped query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionQuery {
    /// Substring to look for in document content; empty matches everything in scope.
    pub text: String,
    pub limit: usize,
    pub offset: usize,
}

/// One document matched by a collection query. Content is not carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionMatch {
    pub location: Location,
    pub tags: TagSet,
    pub content_type: String,
    pub created: String,
    pub last_modified: String,
}

/// A page of collection query results plus the unpaginated match count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionPage {
    pub total: u64,
    pub matches: Vec<CollectionMatch>,
}

/// Storage capability the gateway is built on.
///
/// Implementations must make `write_document` atomic: a concurrent reader observes
/// either the previous document (content and tags) or the new one, never a mix.
/// An empty tag set passed to `query_by_collection` matches nothing.
pub trait DocumentStore: Send + Sync {
    /// Create or fully replace the document at `location`. Rewriting identical
    /// content, type and tags leaves the stored document, `last_modified` included,
    /// untouched.
    fn write_document(
        &self,
        location: &Location,
        tags: &TagSet,
        content: &[u8],
        content_type: &str,
    ) -> Result<(), StoreError>;

    fn read_document(&self, location: &Location) -> Result<Option<StoredDocument>, StoreError>;

    /// Remove the document and its tags. Returns whether anything was removed.
    fn delete_document(&self, location: &Location) -> Result<bool, StoreError>;

    /// Documents carrying every tag in `tags`, ordered most recently modified first.
    fn query_by_collection(
        &self,
        tags: &TagSet,
        query: &CollectionQuery,
    ) -> Result<CollectionPage, StoreError>;
}

/// Hex SHA-256 of a document body.
pub fn content_hash(content: &[u8]) -> String {
    format!("{:x}", sha2::Sha256::digest(content))
}

/// ASCII case-insensitive substring test shared by backends that match in-process.
pub fn content_matches(content: &[u8], text: &str) -> bool {
    if text.is_empty() {
        return true;
    }
    let needle = text.as_bytes();
    if needle.len() > content.len() {
        return false;
    }
    content
        .windows(needle.len())
        .any(|w| w.eq_ignore_ascii_case(needle))
}
