//! Path Resolver: request method + path to a [`Route`].
//!
//! Patterns are tried in a fixed order and the first match wins: data, draft,
//! form, then search. Fields are read only from the captures of the pattern that
//! matched.

use crate::core::error::GatewayError;
use crate::gateway::resource::{
    FORM_DEFINITION_NAME, FormScope, PRIMARY_DATA_NAME, ResourceKind, ResourceRef, Route,
};
use percent_encoding::percent_decode_str;
use regex::{Captures, Regex};
use std::fmt;
use std::sync::LazyLock;

static DATA_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*/crud/([^/]+)/([^/]+)/data/([^/]+)/([^/]+)$").expect("static regex")
});
static DRAFT_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*/crud/([^/]+)/([^/]+)/draft/([^/]+)/([^/]+)$").expect("static regex")
});
static FORM_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*/crud/([^/]+)/([^/]+)/form/([^/]+)$").expect("static regex")
});
static SEARCH_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*/search/([^/]+)/([^/]+)/?$").expect("static regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    Other(String),
}

impl From<&str> for Method {
    fn from(value: &str) -> Self {
        match value {
            "GET" => Method::Get,
            "PUT" => Method::Put,
            "POST" => Method::Post,
            "DELETE" => Method::Delete,
            other => Method::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Put => f.write_str("PUT"),
            Method::Post => f.write_str("POST"),
            Method::Delete => f.write_str("DELETE"),
            Method::Other(m) => f.write_str(m),
        }
    }
}

/// Resolve `path` (no query string) for `method`.
///
/// PUT, GET and DELETE address crud resources; POST addresses search scopes.
pub fn resolve(method: &Method, path: &str) -> Result<Route, GatewayError> {
    let route = match method {
        Method::Get | Method::Put | Method::Delete => {
            resolve_resource(path)?.map(Route::Resource)
        }
        Method::Post => resolve_search(path)?.map(Route::Search),
        Method::Other(m) => return Err(GatewayError::MethodNotAllowed(m.clone())),
    };
    route.ok_or_else(|| GatewayError::NoRouteMatch {
        method: method.to_string(),
        path: path.to_string(),
    })
}

/// Match the crud patterns. `Ok(None)` means no pattern matched.
pub fn resolve_resource(path: &str) -> Result<Option<ResourceRef>, GatewayError> {
    if let Some(caps) = DATA_PATH.captures(path) {
        return data_ref(&caps, false).map(Some);
    }
    if let Some(caps) = DRAFT_PATH.captures(path) {
        return data_ref(&caps, true).map(Some);
    }
    if let Some(caps) = FORM_PATH.captures(path) {
        return form_ref(&caps).map(Some);
    }
    Ok(None)
}

pub fn resolve_search(path: &str) -> Result<Option<FormScope>, GatewayError> {
    let Some(caps) = SEARCH_PATH.captures(path) else {
        return Ok(None);
    };
    let app = decode(&caps, 1)?;
    let form = decode(&caps, 2)?;
    FormScope::new(&app, &form).map(Some)
}

fn data_ref(caps: &Captures<'_>, draft: bool) -> Result<ResourceRef, GatewayError> {
    let app = decode(caps, 1)?;
    let form = decode(caps, 2)?;
    let id = decode(caps, 3)?;
    let name = decode(caps, 4)?;
    if name == PRIMARY_DATA_NAME {
        ResourceRef::from_parts(ResourceKind::FormData, &app, &form, draft, Some(&id), None)
    } else {
        ResourceRef::from_parts(
            ResourceKind::DataAttachment,
            &app,
            &form,
            draft,
            Some(&id),
            Some(&name),
        )
    }
}

fn form_ref(caps: &Captures<'_>) -> Result<ResourceRef, GatewayError> {
    let app = decode(caps, 1)?;
    let form = decode(caps, 2)?;
    let name = decode(caps, 3)?;
    if name == FORM_DEFINITION_NAME {
        ResourceRef::from_parts(ResourceKind::FormDefinition, &app, &form, false, None, None)
    } else {
        ResourceRef::from_parts(
            ResourceKind::FormAttachment,
            &app,
            &form,
            false,
            None,
            Some(&name),
        )
    }
}

fn decode(caps: &Captures<'_>, group: usize) -> Result<String, GatewayError> {
    let raw = caps.get(group).map(|m| m.as_str()).unwrap_or_default();
    percent_decode_str(raw)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| {
            GatewayError::InvalidResourceReference(format!(
                "segment '{raw}' is not valid percent-encoded UTF-8"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::resource::Segment;

    fn get(path: &str) -> Result<Route, GatewayError> {
        resolve(&Method::Get, path)
    }

    #[test]
    fn test_primary_data_document() {
        let route = get("/crud/acme/invoice/data/42/data.xml").unwrap();
        let Route::Resource(r) = route else {
            panic!("expected resource route");
        };
        assert_eq!(r.kind(), ResourceKind::FormData);
        assert!(!r.is_draft());
        assert_eq!(r.app().as_str(), "acme");
        assert_eq!(r.form().as_str(), "invoice");
        assert_eq!(r.document_id().map(Segment::as_str), Some("42"));
    }

    #[test]
    fn test_draft_attachment() {
        let Route::Resource(r) = get("/fr/service/persistence/crud/acme/invoice/draft/7/scan.png").unwrap()
        else {
            panic!("expected resource route");
        };
        assert_eq!(r.kind(), ResourceKind::DataAttachment);
        assert!(r.is_draft());
        assert_eq!(r.attachment_name().map(Segment::as_str), Some("scan.png"));
    }

    #[test]
    fn test_form_definition_and_asset() {
        let Route::Resource(r) = get("/crud/acme/invoice/form/form.xhtml").unwrap() else {
            panic!("expected resource route");
        };
        assert_eq!(r.kind(), ResourceKind::FormDefinition);

        let Route::Resource(r) = get("/crud/acme/invoice/form/logo.png").unwrap() else {
            panic!("expected resource route");
        };
        assert_eq!(r.kind(), ResourceKind::FormAttachment);
        assert_eq!(r.attachment_name().map(Segment::as_str), Some("logo.png"));
    }

    #[test]
    fn test_name_comparison_is_case_sensitive() {
        let Route::Resource(r) = get("/crud/acme/invoice/data/42/DATA.XML").unwrap() else {
            panic!("expected resource route");
        };
        assert_eq!(r.kind(), ResourceKind::DataAttachment);

        let Route::Resource(r) = get("/crud/acme/invoice/form/Form.xhtml").unwrap() else {
            panic!("expected resource route");
        };
        assert_eq!(r.kind(), ResourceKind::FormAttachment);
    }

    #[test]
    fn test_malformed_paths_do_not_match() {
        for path in [
            "",
            "/",
            "/crud/acme",
            "/crud/acme/invoice",
            "/crud/acme/invoice/data/42",
            "/crud/acme/invoice/data/42/",
            "/crud/acme/invoice/data//data.xml",
            "/crud/acme/invoice/data/42/data.xml/extra",
            "/crud/acme/invoice/other/42/data.xml",
            "crud/acme/invoice/form/form.xhtml",
            "/search/acme/invoice",
        ] {
            let err = get(path).unwrap_err();
            assert!(
                matches!(err, GatewayError::NoRouteMatch { .. }),
                "{path:?} should not match: {err}"
            );
        }
    }

    #[test]
    fn test_search_only_for_post() {
        let route = resolve(&Method::Post, "/search/acme/invoice/").unwrap();
        assert_eq!(route, Route::Search(FormScope::new("acme", "invoice").unwrap()));

        let err = resolve(&Method::Post, "/crud/acme/invoice/data/42/data.xml").unwrap_err();
        assert!(matches!(err, GatewayError::NoRouteMatch { .. }));

        let err = resolve(&Method::Put, "/search/acme/invoice").unwrap_err();
        assert!(matches!(err, GatewayError::NoRouteMatch { .. }));
    }

    #[test]
    fn test_unsupported_method() {
        let err = resolve(&Method::from("PATCH"), "/crud/acme/invoice/form/form.xhtml").unwrap_err();
        assert!(matches!(err, GatewayError::MethodNotAllowed(_)));
    }

    #[test]
    fn test_segments_are_percent_decoded() {
        let Route::Resource(r) = get("/crud/acme/my%20form/data/a%2Eb/data.xml").unwrap() else {
            panic!("expected resource route");
        };
        assert_eq!(r.form().as_str(), "my form");
        assert_eq!(r.document_id().map(Segment::as_str), Some("a.b"));
    }

    #[test]
    fn test_hostile_decoded_segments_are_rejected() {
        for path in [
            "/crud/acme/invoice/data/a%2Fb/data.xml",
            "/crud/acme/invoice/data/%2E%2E/data.xml",
            "/crud/acme/invoice/data/%FF/data.xml",
            "/crud/acme/invoice/data/../data.xml",
        ] {
            let err = get(path).unwrap_err();
            assert!(
                matches!(err, GatewayError::InvalidResourceReference(_)),
                "{path:?}: {err}"
            );
        }
    }
}
