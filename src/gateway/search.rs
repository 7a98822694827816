//! Search Operations: scoped queries over a form's data documents.
//!
//! A search is always restricted to the collection tags of one (app, form)
//! scope. The request comes from the POST body
//! (`<search><query/><page-size/><page-number/></search>`) or, when the body is
//! empty, from the URL query string.

use crate::core::error::GatewayError;
use crate::core::store::{CollectionMatch, CollectionQuery, DocumentStore, TagSet};
use crate::gateway::address::{AddressMapper, TAG_DRAFT, instance_id};
use crate::gateway::resource::FormScope;
use percent_encoding::percent_decode_str;
use quick_xml::Reader;
use quick_xml::escape::{escape, unescape};
use quick_xml::events::Event;
use std::sync::Arc;
use std::vec;

/// Parsed search parameters. `query: None` means the request carried no usable query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub page_size: Option<usize>,
    pub page_number: Option<usize>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Query,
    PageSize,
    PageNumber,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"query" => Some(Field::Query),
            b"page-size" => Some(Field::PageSize),
            b"page-number" => Some(Field::PageNumber),
            _ => None,
        }
    }
}

impl SearchRequest {
    /// Read the request from `body`, or from `query_string` when the body is blank.
    /// Malformed input yields a request without a query.
    pub fn parse(body: &[u8], query_string: Option<&str>) -> Self {
        if body.iter().all(u8::is_ascii_whitespace) {
            return query_string.map(Self::from_query_string).unwrap_or_default();
        }
        Self::from_xml(body).unwrap_or_else(|| {
            tracing::debug!("malformed search body; treating query as missing");
            Self::default()
        })
    }

    fn from_xml(body: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(body).ok()?;
        let mut reader = Reader::from_str(text);
        let mut request = SearchRequest::default();
        let mut current: Option<(Field, String)> = None;
        let mut saw_root = false;

        loop {
            match reader.read_event().ok()? {
                Event::Start(e) => {
                    let name = e.name();
                    if !saw_root {
                        if name.as_ref() != b"search" {
                            return None;
                        }
                        saw_root = true;
                    } else if current.is_none() {
                        current = Field::from_name(name.as_ref()).map(|f| (f, String::new()));
                    }
                }
                Event::Empty(e) => {
                    let name = e.name();
                    if !saw_root {
                        return (name.as_ref() == b"search").then_some(request);
                    }
                    if let Some(field) = Field::from_name(name.as_ref()) {
                        request.set(field, "");
                    }
                }
                Event::Text(t) => {
                    if let Some((_, raw)) = current.as_mut() {
                        raw.push_str(&String::from_utf8_lossy(&t));
                    }
                }
                Event::CData(c) => {
                    if let Some((_, raw)) = current.as_mut() {
                        raw.push_str(&escape(String::from_utf8_lossy(&c).as_ref()));
                    }
                }
                Event::GeneralRef(r) => {
                    if let Some((_, raw)) = current.as_mut() {
                        raw.push('&');
                        raw.push_str(&String::from_utf8_lossy(&r));
                        raw.push(';');
                    }
                }
                Event::End(e) => {
                    if let Some((field, raw)) = current.take() {
                        if Field::from_name(e.name().as_ref()) == Some(field) {
                            let value = unescape(&raw).ok()?;
                            request.set(field, &value);
                        } else {
                            current = Some((field, raw));
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        saw_root.then_some(request)
    }

    fn from_query_string(qs: &str) -> Self {
        let mut request = SearchRequest::default();
        for pair in qs.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let Some(field) = Field::from_name(key.as_bytes()) else {
                continue;
            };
            let value = value.replace('+', " ");
            match percent_decode_str(&value).decode_utf8() {
                Ok(value) => request.set(field, &value),
                Err(_) if field == Field::Query => request.query = None,
                Err(_) => {}
            }
        }
        request
    }

    fn set(&mut self, field: Field, value: &str) {
        match field {
            Field::Query => self.query = Some(value.trim().to_string()),
            Field::PageSize => self.page_size = value.trim().parse().ok(),
            Field::PageNumber => self.page_number = value.trim().parse().ok(),
        }
    }
}

/// One document found by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// Document id the result belongs to, when its tags carry one.
    pub name: Option<String>,
    pub draft: bool,
    pub created: String,
    pub last_modified: String,
    pub location: String,
    pub content_type: String,
}

/// Finite result sequence; consumed once.
#[derive(Debug)]
pub struct SearchResults {
    total: u64,
    page_size: usize,
    page_number: usize,
    items: vec::IntoIter<SearchResult>,
}

impl SearchResults {
    fn empty(page_size: usize, page_number: usize) -> Self {
        Self {
            total: 0,
            page_size,
            page_number,
            items: Vec::new().into_iter(),
        }
    }

    /// Matches in scope across all pages.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_number(&self) -> usize {
        self.page_number
    }

    /// Render the remaining results as a `<documents>` XML document.
    pub fn render_xml(self) -> String {
        let mut out = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<documents total=\"{}\" page-size=\"{}\" page-number=\"{}\">",
            self.total, self.page_size, self.page_number
        );
        for doc in self {
            out.push_str(&format!(
                "\n  <document name=\"{}\" draft=\"{}\" created=\"{}\" last-modified=\"{}\" location=\"{}\" content-type=\"{}\"/>",
                escape(doc.name.as_deref().unwrap_or_default()),
                doc.draft,
                escape(doc.created.as_str()),
                escape(doc.last_modified.as_str()),
                escape(doc.location.as_str()),
                escape(doc.content_type.as_str()),
            ));
        }
        out.push_str("\n</documents>\n");
        out
    }
}

impl Iterator for SearchResults {
    type Item = SearchResult;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

#[derive(Clone)]
pub struct SearchOps {
    store: Arc<dyn DocumentStore>,
    mapper: AddressMapper,
    default_page_size: usize,
    max_page_size: usize,
}

impl SearchOps {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        mapper: AddressMapper,
        default_page_size: usize,
        max_page_size: usize,
    ) -> Self {
        let max_page_size = max_page_size.max(1);
        Self {
            store,
            mapper,
            default_page_size: default_page_size.clamp(1, max_page_size),
            max_page_size,
        }
    }

    pub fn search(
        &self,
        scope: &FormScope,
        request: &SearchRequest,
    ) -> Result<SearchResults, GatewayError> {
        let page_size = request
            .page_size
            .filter(|n| *n > 0)
            .unwrap_or(self.default_page_size)
            .min(self.max_page_size);
        let page_number = request.page_number.filter(|n| *n > 0).unwrap_or(1);

        let Some(text) = request.query.clone() else {
            return Ok(SearchResults::empty(page_size, page_number));
        };

        let scope_tags = self.mapper.search_tags(scope);
        let query = CollectionQuery {
            text,
            limit: page_size,
            offset: (page_number - 1).saturating_mul(page_size),
        };
        let page = self
            .store
            .query_by_collection(&scope_tags, &query)
            .map_err(|source| {
                tracing::warn!(scope = %scope, error = %source, "search backend fault");
                GatewayError::SearchBackend {
                    scope: scope.to_string(),
                    source,
                }
            })?;

        let fetched = page.matches.len();
        let items: Vec<SearchResult> = page
            .matches
            .into_iter()
            .filter_map(|m| in_scope(&scope_tags, m))
            .collect();
        let total = page.total.saturating_sub((fetched - items.len()) as u64);
        tracing::debug!(scope = %scope, total, returned = items.len(), "search");

        Ok(SearchResults {
            total,
            page_size,
            page_number,
            items: items.into_iter(),
        })
    }
}

fn in_scope(scope_tags: &TagSet, m: CollectionMatch) -> Option<SearchResult> {
    if !scope_tags.is_subset(&m.tags) {
        tracing::warn!(location = %m.location, "store returned a document outside the search scope");
        return None;
    }
    Some(SearchResult {
        name: instance_id(&m.tags),
        draft: m.tags.contains(TAG_DRAFT),
        created: m.created,
        last_modified: m.last_modified,
        location: m.location.to_string(),
        content_type: m.content_type,
    })
}
