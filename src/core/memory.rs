//! In-process [`DocumentStore`], used by tests and `serve --memory`.

use crate::core::error::StoreError;
use crate::core::store::{
    CollectionMatch, CollectionPage, CollectionQuery, DocumentStore, Location, StoredDocument,
    TagSet, content_hash, content_matches,
};
use crate::core::time;
use rustc_hash::FxHashMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<FxHashMap<Location, StoredDocument>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.read().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentStore for MemoryStore {
    fn write_document(
        &self,
        location: &Location,
        tags: &TagSet,
        content: &[u8],
        content_type: &str,
    ) -> Result<(), StoreError> {
        let now = time::now_epoch_z();
        let mut docs = self
            .documents
            .write()
            .map_err(|_| StoreError::LockPoisoned("memory store"))?;
        let hash = content_hash(content);
        let existing = docs.get(location);
        if existing.is_some_and(|doc| doc.is_same_version(&hash, content_type, tags)) {
            return Ok(());
        }
        let created = existing
            .map(|doc| doc.created.clone())
            .unwrap_or_else(|| now.clone());
        docs.insert(
            location.clone(),
            StoredDocument {
                location: location.clone(),
                content: content.to_vec(),
                content_type: content_type.to_string(),
                content_hash: hash,
                tags: tags.clone(),
                created,
                last_modified: now,
            },
        );
        Ok(())
    }

    fn read_document(&self, location: &Location) -> Result<Option<StoredDocument>, StoreError> {
        let docs = self
            .documents
            .read()
            .map_err(|_| StoreError::LockPoisoned("memory store"))?;
        Ok(docs.get(location).cloned())
    }

    fn delete_document(&self, location: &Location) -> Result<bool, StoreError> {
        let mut docs = self
            .documents
            .write()
            .map_err(|_| StoreError::LockPoisoned("memory store"))?;
        Ok(docs.remove(location).is_some())
    }

    fn query_by_collection(
        &self,
        tags: &TagSet,
        query: &CollectionQuery,
    ) -> Result<CollectionPage, StoreError> {
        if tags.is_empty() || query.limit == 0 {
            return Ok(CollectionPage::default());
        }

        let docs = self
            .documents
            .read()
            .map_err(|_| StoreError::LockPoisoned("memory store"))?;
        let mut hits: Vec<&StoredDocument> = docs
            .values()
            .filter(|doc| tags.is_subset(&doc.tags) && content_matches(&doc.content, &query.text))
            .collect();
        hits.sort_by(|a, b| {
            b.last_modified
                .cmp(&a.last_modified)
                .then_with(|| a.location.cmp(&b.location))
        });

        let total = hits.len() as u64;
        let matches = hits
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|doc| CollectionMatch {
                location: doc.location.clone(),
                tags: doc.tags.clone(),
                content_type: doc.content_type.clone(),
                created: doc.created.clone(),
                last_modified: doc.last_modified.clone(),
            })
            .collect();

        Ok(CollectionPage { total, matches })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(items: &[&str]) -> TagSet {
        items.iter().copied().collect()
    }

    #[test]
    fn test_overwrite_preserves_created_and_replaces_tags() {
        let store = MemoryStore::new();
        let loc = Location::new("/orbeon/fr/acme/invoice/data/1.xml");
        store
            .write_document(&loc, &tags(&["a", "b"]), b"<one/>", "application/xml")
            .unwrap();
        let first = store.read_document(&loc).unwrap().unwrap();

        store
            .write_document(&loc, &tags(&["c"]), b"<two/>", "application/xml")
            .unwrap();
        let second = store.read_document(&loc).unwrap().unwrap();

        assert_eq!(second.created, first.created);
        assert_eq!(second.content, b"<two/>");
        assert_eq!(second.tags, tags(&["c"]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_identical_rewrite_keeps_last_modified() {
        let store = MemoryStore::new();
        let loc = Location::new("/orbeon/fr/acme/invoice/data/1.xml");
        store
            .write_document(&loc, &tags(&["a"]), b"<one/>", "application/xml")
            .unwrap();
        let mut docs = store.documents.write().unwrap();
        if let Some(doc) = docs.get_mut(&loc) {
            doc.last_modified = "1Z".to_string();
        }
        drop(docs);

        store
            .write_document(&loc, &tags(&["a"]), b"<one/>", "application/xml")
            .unwrap();
        assert_eq!(store.read_document(&loc).unwrap().unwrap().last_modified, "1Z");

        store
            .write_document(&loc, &tags(&["a", "b"]), b"<one/>", "application/xml")
            .unwrap();
        assert_ne!(store.read_document(&loc).unwrap().unwrap().last_modified, "1Z");
    }

    #[test]
    fn test_query_requires_every_scope_tag() {
        let store = MemoryStore::new();
        store
            .write_document(&Location::new("/a"), &tags(&["x", "y"]), b"hello", "text/plain")
            .unwrap();
        store
            .write_document(&Location::new("/b"), &tags(&["x"]), b"hello", "text/plain")
            .unwrap();

        let query = CollectionQuery {
            text: String::new(),
            limit: 10,
            offset: 0,
        };
        let page = store.query_by_collection(&tags(&["x", "y"]), &query).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.matches[0].location, Location::new("/a"));

        let page = store.query_by_collection(&TagSet::new(), &query).unwrap();
        assert_eq!(page.total, 0);
    }

    #[test]
    fn test_delete_reports_absence() {
        let store = MemoryStore::new();
        let loc = Location::new("/gone");
        assert!(!store.delete_document(&loc).unwrap());
        store
            .write_document(&loc, &tags(&["t"]), b"x", "text/plain")
            .unwrap();
        assert!(store.delete_document(&loc).unwrap());
        assert!(store.read_document(&loc).unwrap().is_none());
    }
}
