use formgate::core::config::{GatewayConfig, parse_config};
use formgate::core::memory::MemoryStore;
use formgate::core::sqlite::SqliteStore;
use formgate::core::store::DocumentStore;
use formgate::gateway::{Dispatcher, Request, Response};
use std::sync::Arc;
use tempfile::TempDir;

fn put(d: &Dispatcher, url: &str, body: &str) {
    let response = d.dispatch(&Request::new("PUT", url).with_body(body));
    assert_eq!(response.status, 204, "PUT {url}");
}

fn search(d: &Dispatcher, url: &str, body: &str) -> String {
    let response: Response = d.dispatch(&Request::new("POST", url).with_body(body));
    assert_eq!(response.status, 200, "POST {url}");
    assert_eq!(response.content_type.as_deref(), Some("application/xml"));
    String::from_utf8(response.body).expect("utf-8 search results")
}

fn seeded(store: Arc<dyn DocumentStore>, config: &GatewayConfig) -> Dispatcher {
    let gateway = Dispatcher::new(store, config);
    put(&gateway, "/crud/acme/invoice/data/1/data.xml", "<invoice><customer>ACME</customer></invoice>");
    put(&gateway, "/crud/acme/invoice/data/2/data.xml", "<invoice><customer>Globex</customer></invoice>");
    put(&gateway, "/crud/acme/invoice/draft/3/data.xml", "<invoice><customer>ACME draft</customer></invoice>");
    put(&gateway, "/crud/acme/other-form/data/9/data.xml", "<invoice><customer>ACME</customer></invoice>");
    put(&gateway, "/crud/other-app/invoice/data/8/data.xml", "<invoice><customer>ACME</customer></invoice>");
    put(&gateway, "/crud/acme/invoice/form/form.xhtml", "<xh:html>ACME</xh:html>");
    gateway
}

#[test]
fn search_never_leaves_the_app_and_form_scope() {
    let tmp = TempDir::new().expect("tempdir");
    let sqlite: Arc<dyn DocumentStore> =
        Arc::new(SqliteStore::open(tmp.path().join("search.db")).expect("open sqlite"));
    let memory: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());

    for store in [memory, sqlite] {
        let gateway = seeded(store, &GatewayConfig::default());
        let xml = search(
            &gateway,
            "/search/acme/invoice",
            "<search><query>acme</query></search>",
        );

        assert!(xml.contains(r#"total="2""#), "{xml}");
        assert!(xml.contains(r#"name="1""#), "{xml}");
        assert!(xml.contains(r#"name="3" draft="true""#), "{xml}");
        assert!(!xml.contains("other-form"), "{xml}");
        assert!(!xml.contains("other-app"), "{xml}");
        assert!(!xml.contains("definition.xml"), "{xml}");
        assert!(!xml.contains(r#"name="2""#), "{xml}");
    }
}

#[test]
fn empty_query_lists_everything_in_scope() {
    let gateway = seeded(Arc::new(MemoryStore::new()), &GatewayConfig::default());
    let xml = search(&gateway, "/search/acme/invoice/", "<search><query/></search>");
    assert!(xml.contains(r#"total="3""#), "{xml}");
}

#[test]
fn missing_or_malformed_query_yields_no_results() {
    let gateway = seeded(Arc::new(MemoryStore::new()), &GatewayConfig::default());
    for body in ["<search/>", "<search><page-size>5</page-size></search>", "not xml <", ""] {
        let xml = search(&gateway, "/search/acme/invoice", body);
        assert!(xml.contains(r#"total="0""#), "{body:?}: {xml}");
        assert!(!xml.contains("<document "), "{body:?}: {xml}");
    }
}

#[test]
fn query_string_is_used_when_body_is_empty() {
    let gateway = seeded(Arc::new(MemoryStore::new()), &GatewayConfig::default());
    let xml = search(&gateway, "/search/acme/invoice?query=globex", "");
    assert!(xml.contains(r#"total="1""#), "{xml}");
    assert!(xml.contains(r#"name="2""#), "{xml}");
}

#[test]
fn cdata_and_entity_queries_are_applied() {
    let gateway = seeded(Arc::new(MemoryStore::new()), &GatewayConfig::default());
    let xml = search(
        &gateway,
        "/search/acme/invoice",
        "<search><query><![CDATA[globex]]></query></search>",
    );
    assert!(xml.contains(r#"total="1""#), "{xml}");
    assert!(xml.contains(r#"name="2""#), "{xml}");

    let xml = search(
        &gateway,
        "/search/acme/invoice",
        "<search><query>&lt;customer&gt;Glo<![CDATA[bex]]></query></search>",
    );
    assert!(xml.contains(r#"total="1""#), "{xml}");
    assert!(xml.contains(r#"name="2""#), "{xml}");
}

#[test]
fn pagination_walks_the_scope_and_clamps_page_size() {
    let config = parse_config("[search]\ndefault_page_size = 2\nmax_page_size = 2\n").expect("config");
    let gateway = Dispatcher::new(Arc::new(MemoryStore::new()), &config);
    for id in 1..=5 {
        put(
            &gateway,
            &format!("/crud/acme/invoice/data/{id}/data.xml"),
            "<invoice/>",
        );
    }

    let first = search(
        &gateway,
        "/search/acme/invoice",
        "<search><query/><page-size>50</page-size><page-number>1</page-number></search>",
    );
    assert!(first.contains(r#"total="5" page-size="2" page-number="1""#), "{first}");
    assert_eq!(first.matches("<document ").count(), 2);

    let last = search(
        &gateway,
        "/search/acme/invoice",
        "<search><query/><page-number>3</page-number></search>",
    );
    assert_eq!(last.matches("<document ").count(), 1, "{last}");

    let past_end = search(
        &gateway,
        "/search/acme/invoice",
        "<search><query/><page-number>9</page-number></search>",
    );
    assert_eq!(past_end.matches("<document ").count(), 0, "{past_end}");
}

#[test]
fn search_route_only_answers_post() {
    let gateway = Dispatcher::new(Arc::new(MemoryStore::new()), &GatewayConfig::default());
    let response = gateway.dispatch(&Request::new("PUT", "/search/acme/invoice").with_body("<x/>"));
    assert_eq!(response.status, 400);
}
