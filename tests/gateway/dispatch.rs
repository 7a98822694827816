use formgate::core::config::{GatewayConfig, parse_config};
use formgate::core::memory::MemoryStore;
use formgate::core::sqlite::SqliteStore;
use formgate::core::store::DocumentStore;
use formgate::gateway::dispatch::{ErrorBody, HEADER_ETAG, HEADER_LAST_MODIFIED};
use formgate::gateway::{Dispatcher, Request, Response};
use std::sync::Arc;
use tempfile::TempDir;

fn memory_gateway() -> Dispatcher {
    Dispatcher::new(Arc::new(MemoryStore::new()), &GatewayConfig::default())
}

fn sqlite_gateway(tmp: &TempDir) -> Dispatcher {
    let store = SqliteStore::open(tmp.path().join("forms.db")).expect("open sqlite store");
    Dispatcher::new(Arc::new(store), &GatewayConfig::default())
}

fn put(d: &Dispatcher, url: &str, body: &[u8]) -> Response {
    d.dispatch(&Request::new("PUT", url).with_body(body))
}

fn get(d: &Dispatcher, url: &str) -> Response {
    d.dispatch(&Request::new("GET", url))
}

fn error_code(response: &Response) -> String {
    let body: ErrorBody = serde_json::from_slice(&response.body).expect("json error body");
    body.code
}

#[test]
fn put_then_get_form_data_returns_identical_xml_on_both_backends() {
    let tmp = TempDir::new().expect("tempdir");
    for gateway in [memory_gateway(), sqlite_gateway(&tmp)] {
        let stored = put(&gateway, "/crud/acme/invoice/data/42/data.xml", b"<invoice/>");
        assert_eq!(stored.status, 204);
        let etag = stored.header(HEADER_ETAG).expect("etag on store").to_string();

        let fetched = get(&gateway, "/crud/acme/invoice/data/42/data.xml");
        assert_eq!(fetched.status, 200);
        assert_eq!(fetched.body, b"<invoice/>");
        assert_eq!(fetched.content_type.as_deref(), Some("application/xml"));
        assert_eq!(fetched.header(HEADER_ETAG), Some(etag.as_str()));
        assert!(fetched.header(HEADER_LAST_MODIFIED).is_some());
    }
}

#[test]
fn form_definition_is_served_as_xhtml() {
    let gateway = memory_gateway();
    let stored = put(
        &gateway,
        "/crud/acme/invoice/form/form.xhtml",
        b"<xh:html xmlns:xh=\"http://www.w3.org/1999/xhtml\"/>",
    );
    assert_eq!(stored.status, 204);

    let fetched = get(&gateway, "/crud/acme/invoice/form/form.xhtml");
    assert_eq!(fetched.status, 200);
    assert_eq!(fetched.content_type.as_deref(), Some("application/xhtml+xml"));
}

#[test]
fn attachments_keep_declared_or_guessed_content_type() {
    let gateway = memory_gateway();
    let declared = gateway.dispatch(
        &Request::new("PUT", "/crud/acme/invoice/data/42/photo")
            .with_content_type("image/jpeg")
            .with_body(&b"\xff\xd8\xff"[..]),
    );
    assert_eq!(declared.status, 204);
    put(&gateway, "/crud/acme/invoice/form/logo.png", b"\x89PNG");

    let photo = get(&gateway, "/crud/acme/invoice/data/42/photo");
    assert_eq!(photo.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(photo.body, b"\xff\xd8\xff");

    let logo = get(&gateway, "/crud/acme/invoice/form/logo.png");
    assert_eq!(logo.content_type.as_deref(), Some("image/png"));
}

#[test]
fn get_of_never_stored_resource_is_not_found() {
    let gateway = memory_gateway();
    let response = get(&gateway, "/crud/acme/invoice/data/404/data.xml");
    assert_eq!(response.status, 404);
    assert_eq!(error_code(&response), "not_found");
}

#[test]
fn malformed_paths_are_client_errors_not_panics() {
    let gateway = memory_gateway();
    for url in [
        "/crud/acme",
        "/crud/acme/invoice/data/42",
        "/",
        "/search/acme/invoice",
        "/crud/acme/invoice/data/%2E%2E/data.xml",
    ] {
        let response = get(&gateway, url);
        assert_eq!(response.status, 400, "{url}");
    }
    assert_eq!(error_code(&get(&gateway, "/crud/acme")), "no_route_match");
}

#[test]
fn unsupported_methods_are_rejected_with_405() {
    let gateway = memory_gateway();
    let response = gateway.dispatch(&Request::new("PATCH", "/crud/acme/invoice/data/1/data.xml"));
    assert_eq!(response.status, 405);
    assert_eq!(error_code(&response), "method_not_allowed");
}

#[test]
fn drafts_and_published_data_never_alias() {
    let gateway = memory_gateway();
    put(&gateway, "/crud/acme/invoice/draft/42/data.xml", b"<draft/>");
    assert_eq!(get(&gateway, "/crud/acme/invoice/data/42/data.xml").status, 404);

    put(&gateway, "/crud/acme/invoice/data/42/data.xml", b"<published/>");
    assert_eq!(
        get(&gateway, "/crud/acme/invoice/draft/42/data.xml").body,
        b"<draft/>"
    );
    assert_eq!(
        get(&gateway, "/crud/acme/invoice/data/42/data.xml").body,
        b"<published/>"
    );
}

#[test]
fn overwrite_replaces_content_fully() {
    let gateway = memory_gateway();
    put(&gateway, "/crud/acme/invoice/data/1/data.xml", b"<a>long original</a>");
    put(&gateway, "/crud/acme/invoice/data/1/data.xml", b"<b/>");
    assert_eq!(get(&gateway, "/crud/acme/invoice/data/1/data.xml").body, b"<b/>");
}

#[test]
fn delete_removes_resource_and_second_delete_is_not_found() {
    let tmp = TempDir::new().expect("tempdir");
    let gateway = sqlite_gateway(&tmp);
    put(&gateway, "/crud/acme/invoice/data/7/scan.png", b"\x89PNG");

    let url = "/crud/acme/invoice/data/7/scan.png";
    assert_eq!(gateway.dispatch(&Request::new("DELETE", url)).status, 204);
    assert_eq!(get(&gateway, url).status, 404);
    assert_eq!(gateway.dispatch(&Request::new("DELETE", url)).status, 404);
}

#[test]
fn oversized_body_is_rejected_before_store() {
    let config = parse_config("[server]\nmax_body_bytes = 8\n").expect("config");
    let store = Arc::new(MemoryStore::new());
    let gateway = Dispatcher::new(store.clone(), &config);

    let response = put(&gateway, "/crud/acme/invoice/data/1/data.xml", b"<invoice>too big</invoice>");
    assert_eq!(response.status, 413);
    assert_eq!(error_code(&response), "payload_too_large");
    assert!(store.is_empty());
}

#[test]
fn attachment_allow_list_rejects_other_types() {
    let config =
        parse_config("[attachments]\nallowed_types = [\"image/png\"]\n").expect("config");
    let gateway = Dispatcher::new(Arc::new(MemoryStore::new()), &config);

    let rejected = gateway.dispatch(
        &Request::new("PUT", "/crud/acme/invoice/data/1/report.pdf")
            .with_content_type("application/pdf")
            .with_body(&b"%PDF"[..]),
    );
    assert_eq!(rejected.status, 415);
    assert_eq!(error_code(&rejected), "unsupported_attachment_type");

    let accepted = put(&gateway, "/crud/acme/invoice/data/1/scan.png", b"\x89PNG");
    assert_eq!(accepted.status, 204);
}

#[test]
fn custom_namespace_changes_store_locations() {
    let config = parse_config("namespace = \"tenant-a\"\n").expect("config");
    let store = Arc::new(MemoryStore::new());
    let gateway = Dispatcher::new(store.clone(), &config);
    put(&gateway, "/crud/acme/invoice/data/1/data.xml", b"<x/>");

    let location = formgate::core::store::Location::new("/tenant-a/fr/acme/invoice/data/1.xml");
    let doc = store
        .read_document(&location)
        .expect("read")
        .expect("document under custom namespace");
    assert!(doc.tags.contains("tenant-a/fr"));
}
