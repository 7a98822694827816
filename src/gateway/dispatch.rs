//! Request Dispatcher: verb + path in, populated response out.
//!
//! `dispatch` is total. Every request ends in a [`Response`], with failures
//! rendered as a JSON error body carrying the status of the [`GatewayError`].

use crate::core::config::GatewayConfig;
use crate::core::error::GatewayError;
use crate::core::store::DocumentStore;
use crate::core::time::new_request_id;
use crate::gateway::address::AddressMapper;
use crate::gateway::mime::{AttachmentPolicy, types};
use crate::gateway::operations::ResourceOps;
use crate::gateway::resolve::{Method, resolve};
use crate::gateway::resource::{ResourceRef, Route};
use crate::gateway::search::{SearchOps, SearchRequest};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::sync::Arc;
use std::time::Instant;

pub const HEADER_REQUEST_ID: &str = "X-Request-Id";
pub const HEADER_LAST_MODIFIED: &str = "X-Last-Modified";
pub const HEADER_ETAG: &str = "ETag";

/// Transport-neutral request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Request {
    /// `url` may carry a query string; it is split off into `query`.
    pub fn new(method: impl Into<Method>, url: &str) -> Self {
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (url, None),
        };
        Self {
            method: method.into(),
            path: path.to_string(),
            query,
            content_type: None,
            body: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    fn new(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    fn with_body(mut self, content_type: &str, body: Vec<u8>) -> Self {
        self.content_type = Some(content_type.to_string());
        self.body = body;
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// JSON body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub request_id: String,
}

pub fn error_response(err: &GatewayError, request_id: &str) -> Response {
    let body = ErrorBody {
        code: err.code().to_string(),
        message: err.to_string(),
        request_id: request_id.to_string(),
    };
    let json = serde_json::to_vec(&body).unwrap_or_else(|_| err.to_string().into_bytes());
    let mut response = Response::new(err.status()).with_body(types::JSON, json);
    if matches!(err, GatewayError::MethodNotAllowed(_)) {
        response = response.with_header("Allow", "GET, PUT, POST, DELETE");
    }
    response
}

/// Read at most `limit` bytes of body. A declared length over the limit is
/// rejected without reading.
pub fn read_body<R: Read>(
    reader: R,
    declared_len: Option<usize>,
    limit: u64,
) -> Result<Vec<u8>, GatewayError> {
    if declared_len.is_some_and(|len| len as u64 > limit) {
        return Err(GatewayError::PayloadTooLarge { limit });
    }
    let mut body = Vec::with_capacity(declared_len.unwrap_or(0));
    reader
        .take(limit.saturating_add(1))
        .read_to_end(&mut body)
        .map_err(GatewayError::BodyRead)?;
    if body.len() as u64 > limit {
        return Err(GatewayError::PayloadTooLarge { limit });
    }
    Ok(body)
}

pub struct Dispatcher {
    resources: ResourceOps,
    search: SearchOps,
    max_body_bytes: u64,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn DocumentStore>, config: &GatewayConfig) -> Self {
        let mapper = AddressMapper::new(config.namespace.clone());
        Self {
            resources: ResourceOps::new(
                store.clone(),
                mapper.clone(),
                AttachmentPolicy::new(&config.attachments.allowed_types),
            ),
            search: SearchOps::new(
                store,
                mapper,
                config.search.default_page_size,
                config.search.max_page_size,
            ),
            max_body_bytes: config.server.max_body_bytes,
        }
    }

    pub fn max_body_bytes(&self) -> u64 {
        self.max_body_bytes
    }

    pub fn dispatch(&self, request: &Request) -> Response {
        let request_id = new_request_id();
        let span = tracing::info_span!(
            "request",
            id = %request_id,
            method = %request.method,
            path = %request.path
        );
        let _guard = span.enter();
        let started = Instant::now();

        let outcome = if request.body.len() as u64 > self.max_body_bytes {
            Err(GatewayError::PayloadTooLarge {
                limit: self.max_body_bytes,
            })
        } else {
            match request.method {
                Method::Put => self.on_put(request),
                Method::Get => self.on_get(request),
                Method::Post => self.on_post(request),
                Method::Delete => self.on_delete(request),
                Method::Other(ref m) => Err(GatewayError::MethodNotAllowed(m.clone())),
            }
        };

        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                if err.status() >= 500 {
                    tracing::warn!(error = %err, "request failed");
                } else {
                    tracing::debug!(error = %err, "request rejected");
                }
                error_response(&err, &request_id)
            }
        };

        tracing::info!(
            status = response.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "handled"
        );
        response.with_header(HEADER_REQUEST_ID, request_id)
    }

    fn resource_route(&self, request: &Request) -> Result<ResourceRef, GatewayError> {
        match resolve(&request.method, &request.path)? {
            Route::Resource(resource) => {
                tracing::debug!(kind = %resource.kind(), "resolved");
                Ok(resource)
            }
            Route::Search(_) => Err(GatewayError::NoRouteMatch {
                method: request.method.to_string(),
                path: request.path.clone(),
            }),
        }
    }

    fn on_put(&self, request: &Request) -> Result<Response, GatewayError> {
        let resource = self.resource_route(request)?;
        let ack = self
            .resources
            .store(&resource, &request.body, request.content_type.as_deref())?;
        Ok(Response::new(204).with_header(HEADER_ETAG, format!("\"{}\"", ack.content_hash)))
    }

    fn on_get(&self, request: &Request) -> Result<Response, GatewayError> {
        let resource = self.resource_route(request)?;
        let content = self.resources.retrieve(&resource)?;
        Ok(Response::new(200)
            .with_header(HEADER_ETAG, format!("\"{}\"", content.etag))
            .with_header(HEADER_LAST_MODIFIED, content.last_modified)
            .with_body(&content.content_type, content.bytes))
    }

    fn on_delete(&self, request: &Request) -> Result<Response, GatewayError> {
        let resource = self.resource_route(request)?;
        self.resources.delete(&resource)?;
        Ok(Response::new(204))
    }

    fn on_post(&self, request: &Request) -> Result<Response, GatewayError> {
        let scope = match resolve(&request.method, &request.path)? {
            Route::Search(scope) => scope,
            Route::Resource(_) => {
                return Err(GatewayError::NoRouteMatch {
                    method: request.method.to_string(),
                    path: request.path.clone(),
                });
            }
        };
        let search = SearchRequest::parse(&request.body, request.query.as_deref());
        let results = self.search.search(&scope, &search)?;
        Ok(Response::new(200).with_body(types::XML, results.render_xml().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::MemoryStore;
    use std::io::Cursor;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Arc::new(MemoryStore::new()), &GatewayConfig::default())
    }

    #[test]
    fn test_request_splits_query_string() {
        let r = Request::new("POST", "/search/acme/invoice?query=x&page-size=2");
        assert_eq!(r.method, Method::Post);
        assert_eq!(r.path, "/search/acme/invoice");
        assert_eq!(r.query.as_deref(), Some("query=x&page-size=2"));
    }

    #[test]
    fn test_every_response_has_request_id() {
        let d = dispatcher();
        let ok = d.dispatch(&Request::new("PUT", "/crud/a/b/form/form.xhtml").with_body("<x/>"));
        let bad = d.dispatch(&Request::new("GET", "/nowhere"));
        assert_eq!(ok.status, 204);
        assert_eq!(bad.status, 400);
        assert!(ok.header(HEADER_REQUEST_ID).is_some());
        assert!(bad.header("x-request-id").is_some());
    }

    #[test]
    fn test_error_body_is_json() {
        let response = dispatcher().dispatch(&Request::new("GET", "/crud/acme"));
        assert_eq!(response.content_type.as_deref(), Some(types::JSON));
        let body: ErrorBody = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body.code, "no_route_match");
        assert_eq!(Some(body.request_id.as_str()), response.header(HEADER_REQUEST_ID));
    }

    #[test]
    fn test_read_body_limits() {
        assert_eq!(read_body(Cursor::new(b"abc"), Some(3), 3).unwrap(), b"abc");
        assert!(matches!(
            read_body(Cursor::new(b"abc"), Some(4), 3).unwrap_err(),
            GatewayError::PayloadTooLarge { limit: 3 }
        ));
        assert!(matches!(
            read_body(Cursor::new(b"abcd"), None, 3).unwrap_err(),
            GatewayError::PayloadTooLarge { limit: 3 }
        ));
    }

    #[test]
    fn test_method_not_allowed_sets_allow_header() {
        let response = dispatcher().dispatch(&Request::new("PATCH", "/crud/a/b/form/form.xhtml"));
        assert_eq!(response.status, 405);
        assert!(response.header("Allow").is_some());
    }
}
