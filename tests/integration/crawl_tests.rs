//! Single-page, pagination, escalation and cancellation crawls

use crate::support::*;
use field_harvest::crawler::{CancelHandle, DoneReason, Termination};
use field_harvest::FetchError;
use std::sync::Arc;
use wiremock::MockServer;

fn card(name: &str) -> String {
    format!(
        r#"<div class="company-card"><h2 class="name">{}</h2><p class="desc">About {}</p></div>"#,
        name, name
    )
}

fn list_page(names: &[&str], next: Option<&str>) -> String {
    let cards: String = names.iter().map(|n| card(n)).collect();
    let nav = next
        .map(|href| format!(r#"<nav><a class="next" href="{}">Next</a></nav>"#, href))
        .unwrap_or_default();
    format!("<html><body>{}{}</body></html>", cards, nav)
}

const FIELDS: &[(&str, &str)] = &[("Name", ".name"), ("Description", ".desc")];

#[tokio::test]
async fn test_single_page_extracts_every_container() {
    let server = MockServer::start().await;
    mount_page(&server, "/companies", list_page(&["Google", "Acme"], None), 1).await;

    let renderer = Arc::new(ScriptedRenderer::new());
    let config = config(format!("{}/companies", server.uri()), ".company-card", FIELDS);
    let outcome = coordinator(config, renderer.clone()).run().await;

    assert_eq!(outcome.termination, Termination::Completed(DoneReason::SinglePage));
    assert_eq!(column(&outcome.records, "Name"), vec!["Google", "Acme"]);
    assert_eq!(outcome.records[0].get("Description"), Some("About Google"));
    assert!(renderer.calls().is_empty());
    assert_eq!(outcome.stats.list_pages, 1);
}

#[tokio::test]
async fn test_pagination_chain_fetches_each_page_once() {
    let server = MockServer::start().await;
    mount_page(&server, "/list/1", list_page(&["a1", "a2"], Some("/list/2")), 1).await;
    mount_page(&server, "/list/2", list_page(&["b1"], Some("/list/3")), 1).await;
    mount_page(&server, "/list/3", list_page(&["c1", "c2"], None), 1).await;

    let config = config(format!("{}/list/1", server.uri()), ".company-card", FIELDS)
        .with_mode(pagination("a.next"))
        .with_max_pages(10);
    let outcome = coordinator(config, Arc::new(ScriptedRenderer::new())).run().await;

    assert_eq!(
        outcome.termination,
        Termination::Completed(DoneReason::NavigationNotFound)
    );
    assert_eq!(column(&outcome.records, "Name"), vec!["a1", "a2", "b1", "c1", "c2"]);
    assert_eq!(outcome.stats.list_pages, 3);
}

#[tokio::test]
async fn test_pagination_cycle_terminates() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", list_page(&["first"], Some("/b")), 1).await;
    // Links back to the first page with cosmetic differences
    mount_page(&server, "/b", list_page(&["second"], Some("/a/#top")), 1).await;

    let config = config(format!("{}/a", server.uri()), ".company-card", FIELDS)
        .with_mode(pagination("a.next"))
        .with_max_pages(50);
    let outcome = coordinator(config, Arc::new(ScriptedRenderer::new())).run().await;

    match &outcome.termination {
        Termination::Completed(DoneReason::CycleDetected(url)) => {
            assert!(url.path().starts_with("/a"));
        }
        other => panic!("expected cycle detection, got {:?}", other),
    }
    assert_eq!(column(&outcome.records, "Name"), vec!["first", "second"]);
}

#[tokio::test]
async fn test_pagination_stops_at_max_pages() {
    let server = MockServer::start().await;
    mount_page(&server, "/p/1", list_page(&["one"], Some("/p/2")), 1).await;
    mount_page(&server, "/p/2", list_page(&["two"], Some("/p/3")), 1).await;
    mount_page(&server, "/p/3", list_page(&["three"], Some("/p/4")), 0).await;

    let config = config(format!("{}/p/1", server.uri()), ".company-card", FIELDS)
        .with_mode(pagination("a.next"))
        .with_max_pages(2);
    let outcome = coordinator(config, Arc::new(ScriptedRenderer::new())).run().await;

    assert_eq!(
        outcome.termination,
        Termination::Completed(DoneReason::PageLimitReached)
    );
    assert_eq!(column(&outcome.records, "Name"), vec!["one", "two"]);
}

#[tokio::test]
async fn test_zero_containers_escalates_to_dynamic_once() {
    let server = MockServer::start().await;
    mount_page(&server, "/app", r#"<html><body><div id="root"></div></body></html>"#, 1).await;

    let renderer = Arc::new(ScriptedRenderer::new().page("/app", list_page(&["Rendered"], None)));
    let config = config(format!("{}/app", server.uri()), ".company-card", FIELDS);
    let outcome = coordinator(config, renderer.clone()).run().await;

    assert!(outcome.is_completed());
    assert_eq!(column(&outcome.records, "Name"), vec!["Rendered"]);
    assert_eq!(renderer.calls(), vec!["/app"]);
    assert_eq!(outcome.stats.escalations, 1);
}

#[tokio::test]
async fn test_escalation_never_repeats() {
    let server = MockServer::start().await;
    let empty = r#"<html><body><div id="root"></div></body></html>"#;
    mount_page(&server, "/app", empty, 1).await;

    let renderer = Arc::new(ScriptedRenderer::new().page("/app", empty));
    let config = config(format!("{}/app", server.uri()), ".company-card", FIELDS);
    let outcome = coordinator(config, renderer.clone()).run().await;

    assert_eq!(outcome.termination, Termination::Completed(DoneReason::SinglePage));
    assert!(outcome.records.is_empty());
    assert_eq!(renderer.calls().len(), 1);
}

#[tokio::test]
async fn test_force_dynamic_skips_static_fetch() {
    let server = MockServer::start().await;
    mount_page(&server, "/spa", list_page(&["static"], None), 0).await;

    let renderer = Arc::new(ScriptedRenderer::new().page("/spa", list_page(&["dynamic"], None)));
    let config = config(format!("{}/spa", server.uri()), ".company-card", FIELDS)
        .with_force_dynamic_fetch(true);
    let outcome = coordinator(config, renderer.clone()).run().await;

    assert_eq!(column(&outcome.records, "Name"), vec!["dynamic"]);
    assert_eq!(renderer.calls(), vec!["/spa"]);
    assert_eq!(outcome.stats.escalations, 0);
}

#[tokio::test]
async fn test_render_failure_after_escalation_fails_crawl() {
    let server = MockServer::start().await;
    mount_page(&server, "/app", "<html><body></body></html>", 1).await;

    let config = config(format!("{}/app", server.uri()), ".company-card", FIELDS);
    let outcome = coordinator(config, Arc::new(ScriptedRenderer::new())).run().await;

    assert!(matches!(
        outcome.error(),
        Some(FetchError::RenderFailure { .. })
    ));
}

#[tokio::test]
async fn test_render_timeout_is_not_retried() {
    let server = MockServer::start().await;
    let renderer = Arc::new(ScriptedRenderer::new().timeout_on("/slow"));
    let config = config(format!("{}/slow", server.uri()), ".company-card", FIELDS)
        .with_force_dynamic_fetch(true);
    let outcome = coordinator(config, renderer.clone()).run().await;

    assert!(matches!(
        outcome.error(),
        Some(FetchError::RenderTimeout { .. })
    ));
    assert_eq!(renderer.calls(), vec!["/slow"]);
    assert_eq!(outcome.stats.retries, 0);
    assert!(outcome.records.is_empty());
}

#[tokio::test]
async fn test_render_timeout_mid_pagination_keeps_records() {
    let server = MockServer::start().await;
    let renderer = Arc::new(
        ScriptedRenderer::new()
            .page("/list/1", list_page(&["a"], Some("/list/2")))
            .timeout_on("/list/2"),
    );
    let config = config(format!("{}/list/1", server.uri()), ".company-card", FIELDS)
        .with_mode(pagination("a.next"))
        .with_force_dynamic_fetch(true);
    let outcome = coordinator(config, renderer.clone()).run().await;

    assert!(matches!(
        outcome.error(),
        Some(FetchError::RenderTimeout { .. })
    ));
    assert_eq!(column(&outcome.records, "Name"), vec!["a"]);
    assert_eq!(renderer.calls(), vec!["/list/1", "/list/2"]);
    assert_eq!(outcome.stats.retries, 0);
}

#[tokio::test]
async fn test_empty_last_page_without_browser_fails_after_escalation() {
    let server = MockServer::start().await;
    mount_page(&server, "/p/1", list_page(&["one"], Some("/p/2")), 1).await;
    mount_page(&server, "/p/2", "<html><body><p>No results</p></body></html>", 1).await;

    let renderer = Arc::new(ScriptedRenderer::new());
    let config = config(format!("{}/p/1", server.uri()), ".company-card", FIELDS)
        .with_mode(pagination("a.next"));
    let outcome = coordinator(config, renderer.clone()).run().await;

    assert!(matches!(
        outcome.error(),
        Some(FetchError::RenderFailure { url, .. }) if url.ends_with("/p/2")
    ));
    assert_eq!(column(&outcome.records, "Name"), vec!["one"]);
    assert_eq!(renderer.calls(), vec!["/p/2"]);
    assert_eq!(outcome.stats.escalations, 1);
}

#[tokio::test]
async fn test_cancellation_between_pages_keeps_records() {
    let server = MockServer::start().await;
    let cancel = CancelHandle::new();

    let renderer = Arc::new(
        ScriptedRenderer::new()
            .page("/list/1", list_page(&["a"], Some("/list/2")))
            .page("/list/2", list_page(&["b"], Some("/list/3")))
            .page("/list/3", list_page(&["c"], None))
            .cancel_on("/list/2", cancel.clone()),
    );
    let config = config(format!("{}/list/1", server.uri()), ".company-card", FIELDS)
        .with_mode(pagination("a.next"))
        .with_force_dynamic_fetch(true);
    let outcome = coordinator(config, renderer.clone())
        .with_cancel_handle(cancel)
        .run()
        .await;

    assert_eq!(outcome.termination, Termination::Failed(FetchError::Cancelled));
    assert_eq!(column(&outcome.records, "Name"), vec!["a", "b"]);
    assert_eq!(renderer.calls(), vec!["/list/1", "/list/2"]);
}

#[tokio::test]
async fn test_failed_page_keeps_earlier_records() {
    let server = MockServer::start().await;
    mount_page(&server, "/list/1", list_page(&["kept"], Some("/list/2")), 1).await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/list/2"))
        .respond_with(wiremock::ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let config = config(format!("{}/list/1", server.uri()), ".company-card", FIELDS)
        .with_mode(pagination("a.next"));
    let outcome = coordinator(config, Arc::new(ScriptedRenderer::new())).run().await;

    assert!(matches!(
        outcome.error(),
        Some(FetchError::Network { status: Some(503), .. })
    ));
    assert_eq!(column(&outcome.records, "Name"), vec!["kept"]);
    assert_eq!(outcome.stats.retries, 2);
}

#[tokio::test]
async fn test_label_match_fields_across_pages() {
    let server = MockServer::start().await;
    let page = |founded: &str, ceo: &str, next: &str| {
        format!(
            r#"<div class="info-box"><div><strong>Founded:</strong><span>{}</span></div><div><strong>CEO:</strong><span>{}</span></div></div>{}"#,
            founded, ceo, next
        )
    };
    mount_page(&server, "/one", page("1998", "Sundar Pichai", r#"<a class="next" href="/two">»</a>"#), 1).await;
    mount_page(&server, "/two", page("1976", "Tim Cook", ""), 1).await;

    let config = config(
        format!("{}/one", server.uri()),
        ".info-box",
        &[("Founded", "TEXT_MATCH:Founded:|span"), ("CEO", "TEXT_MATCH:CEO:|span")],
    )
    .with_mode(pagination("a.next"));
    let outcome = coordinator(config, Arc::new(ScriptedRenderer::new())).run().await;

    assert_eq!(column(&outcome.records, "Founded"), vec!["1998", "1976"]);
    assert_eq!(column(&outcome.records, "CEO"), vec!["Sundar Pichai", "Tim Cook"]);
}
