//! List-detail crawls

use crate::support::*;
use field_harvest::config::OnDetailError;
use field_harvest::crawler::{DoneReason, Termination};
use field_harvest::FetchError;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FIELDS: &[(&str, &str)] = &[
    ("Name", ".name"),
    ("CEO", "TEXT_MATCH:CEO:|span"),
    ("Founded", ".founded"),
];

fn list_item(name: &str, href: Option<&str>) -> String {
    let link = href
        .map(|h| format!(r#"<a class="more" href="{}">Details</a>"#, h))
        .unwrap_or_default();
    format!(r#"<div class="company"><h2 class="name">{}</h2>{}</div>"#, name, link)
}

fn detail_page(name: &str, ceo: &str, founded: &str) -> String {
    format!(
        r#"<html><body><div class="company"><h2 class="name">{}</h2><div><strong>CEO:</strong><span>{}</span></div><p class="founded">{}</p></div></body></html>"#,
        name, ceo, founded
    )
}

#[tokio::test]
async fn test_list_detail_merges_with_list_precedence() {
    let server = MockServer::start().await;
    let list = [
        list_item("Acme", Some("/detail/1")),
        list_item("Globex", Some("/detail/2")),
        list_item("Initech", Some("/detail/3")),
    ]
    .concat();
    mount_page(&server, "/list", list, 1).await;
    mount_page(&server, "/detail/1", detail_page("ACME Corporation", "Jane Doe", "1998"), 1).await;
    mount_page(&server, "/detail/2", detail_page("Globex Inc", "Hank Scorpio", "1989"), 1).await;
    mount_page(&server, "/detail/3", detail_page("Initech LLC", "Bill Lumbergh", "1999"), 1).await;

    let config = config(format!("{}/list", server.uri()), ".company", FIELDS)
        .with_mode(list_detail("a.more", None))
        .with_detail_concurrency(2);
    let outcome = coordinator(config, Arc::new(ScriptedRenderer::new())).run().await;

    assert_eq!(outcome.termination, Termination::Completed(DoneReason::SinglePage));
    assert_eq!(column(&outcome.records, "Name"), vec!["Acme", "Globex", "Initech"]);
    assert_eq!(
        column(&outcome.records, "CEO"),
        vec!["Jane Doe", "Hank Scorpio", "Bill Lumbergh"]
    );
    assert_eq!(column(&outcome.records, "Founded"), vec!["1998", "1989", "1999"]);
    assert_eq!(outcome.stats.detail_pages, 3);
}

#[tokio::test]
async fn test_detail_results_keep_list_order_when_completing_out_of_order() {
    let server = MockServer::start().await;
    let list = [
        list_item("slow", Some("/d/1")),
        list_item("medium", Some("/d/2")),
        list_item("fast", Some("/d/3")),
    ]
    .concat();
    mount_page(&server, "/list", list, 1).await;
    for (route, ceo, delay_ms) in [("/d/1", "ceo1", 300), ("/d/2", "ceo2", 150), ("/d/3", "ceo3", 0)] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                html(detail_page("x", ceo, "2000")).set_delay(Duration::from_millis(delay_ms)),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let config = config(format!("{}/list", server.uri()), ".company", FIELDS)
        .with_mode(list_detail("a.more", None))
        .with_detail_concurrency(3);
    let outcome = coordinator(config, Arc::new(ScriptedRenderer::new())).run().await;

    assert!(outcome.is_completed());
    assert_eq!(column(&outcome.records, "Name"), vec!["slow", "medium", "fast"]);
    assert_eq!(column(&outcome.records, "CEO"), vec!["ceo1", "ceo2", "ceo3"]);
}

#[tokio::test]
async fn test_record_without_detail_link_is_kept() {
    let server = MockServer::start().await;
    let list = [list_item("Linked", Some("/d/1")), list_item("Unlinked", None)].concat();
    mount_page(&server, "/list", list, 1).await;
    mount_page(&server, "/d/1", detail_page("x", "Jane", "2001"), 1).await;

    let config = config(format!("{}/list", server.uri()), ".company", FIELDS)
        .with_mode(list_detail("a.more", None));
    let outcome = coordinator(config, Arc::new(ScriptedRenderer::new())).run().await;

    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.records[0].get("CEO"), Some("Jane"));
    assert_eq!(outcome.records[1].get("Name"), Some("Unlinked"));
    assert!(outcome.records[1].is_missing("CEO"));
    assert_eq!(outcome.records[1].len(), 3);
}

#[tokio::test]
async fn test_shared_detail_page_fetched_once() {
    let server = MockServer::start().await;
    let list = [
        list_item("North office", Some("/company/acme")),
        list_item("South office", Some("/company/acme?utm_source=list")),
    ]
    .concat();
    mount_page(&server, "/list", list, 1).await;
    mount_page(&server, "/company/acme", detail_page("Acme", "Jane Doe", "1998"), 1).await;

    let config = config(format!("{}/list", server.uri()), ".company", FIELDS)
        .with_mode(list_detail("a.more", None));
    let outcome = coordinator(config, Arc::new(ScriptedRenderer::new())).run().await;

    assert_eq!(column(&outcome.records, "Name"), vec!["North office", "South office"]);
    assert_eq!(column(&outcome.records, "CEO"), vec!["Jane Doe", "Jane Doe"]);
    assert_eq!(outcome.stats.detail_pages, 1);
}

#[tokio::test]
async fn test_max_detail_pages_caps_fetches() {
    let server = MockServer::start().await;
    let list = [
        list_item("one", Some("/d/1")),
        list_item("two", Some("/d/2")),
        list_item("three", Some("/d/3")),
    ]
    .concat();
    mount_page(&server, "/list", list, 1).await;
    mount_page(&server, "/d/1", detail_page("1", "A", "2001"), 1).await;
    mount_page(&server, "/d/2", detail_page("2", "B", "2002"), 1).await;
    mount_page(&server, "/d/3", detail_page("3", "C", "2003"), 0).await;

    let config = config(format!("{}/list", server.uri()), ".company", FIELDS)
        .with_mode(list_detail("a.more", None))
        .with_max_detail_pages(Some(2));
    let outcome = coordinator(config, Arc::new(ScriptedRenderer::new())).run().await;

    assert_eq!(column(&outcome.records, "CEO"), vec!["A", "B", ""]);
    assert_eq!(outcome.records.len(), 3);
}

#[tokio::test]
async fn test_detail_error_fails_crawl_by_default() {
    let server = MockServer::start().await;
    let list = [list_item("ok", Some("/d/ok")), list_item("broken", Some("/d/broken"))].concat();
    mount_page(&server, "/list", list, 1).await;
    mount_page(&server, "/d/ok", detail_page("ok", "Jane", "2000"), 1).await;
    Mock::given(method("GET"))
        .and(path("/d/broken"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(format!("{}/list", server.uri()), ".company", FIELDS)
        .with_mode(list_detail("a.more", None));
    let outcome = coordinator(config, Arc::new(ScriptedRenderer::new())).run().await;

    assert!(matches!(
        outcome.error(),
        Some(FetchError::Network { status: Some(404), .. })
    ));
    // Records of the page in progress are kept, merged as far as possible
    assert_eq!(column(&outcome.records, "Name"), vec!["ok", "broken"]);
    assert_eq!(outcome.records[0].get("CEO"), Some("Jane"));
}

#[tokio::test]
async fn test_detail_error_skip_and_log() {
    let server = MockServer::start().await;
    let list = [list_item("ok", Some("/d/ok")), list_item("broken", Some("/d/broken"))].concat();
    mount_page(&server, "/list", list, 1).await;
    mount_page(&server, "/d/ok", detail_page("ok", "Jane", "2000"), 1).await;
    Mock::given(method("GET"))
        .and(path("/d/broken"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = config(format!("{}/list", server.uri()), ".company", FIELDS)
        .with_mode(list_detail("a.more", None))
        .with_on_detail_error(OnDetailError::SkipAndLog);
    let outcome = coordinator(config, Arc::new(ScriptedRenderer::new())).run().await;

    assert!(outcome.is_completed());
    assert_eq!(column(&outcome.records, "CEO"), vec!["Jane", ""]);
    assert_eq!(outcome.stats.detail_failures, 1);
}

#[tokio::test]
async fn test_detail_page_escalates_when_nothing_resolves() {
    let server = MockServer::start().await;
    mount_page(&server, "/list", list_item("Acme", Some("/d/spa")), 1).await;
    mount_page(&server, "/d/spa", r#"<html><body><div id="app"></div></body></html>"#, 1).await;

    let renderer = Arc::new(ScriptedRenderer::new().page("/d/spa", detail_page("Acme", "Jane", "1998")));
    let config = config(format!("{}/list", server.uri()), ".company", FIELDS)
        .with_mode(list_detail("a.more", None));
    let outcome = coordinator(config, renderer.clone()).run().await;

    assert_eq!(outcome.records[0].get("CEO"), Some("Jane"));
    assert_eq!(renderer.calls(), vec!["/d/spa"]);
    assert_eq!(outcome.stats.escalations, 1);
}

#[tokio::test]
async fn test_list_detail_with_pagination() {
    let server = MockServer::start().await;
    let page1 = format!(
        r#"{}<a class="next" href="/list/2">Next</a>"#,
        list_item("first", Some("/d/1"))
    );
    let page2 = list_item("second", Some("/d/2"));
    mount_page(&server, "/list/1", page1, 1).await;
    mount_page(&server, "/list/2", page2, 1).await;
    mount_page(&server, "/d/1", detail_page("1", "Ann", "2001"), 1).await;
    mount_page(&server, "/d/2", detail_page("2", "Bob", "2002"), 1).await;

    let config = config(format!("{}/list/1", server.uri()), ".company", FIELDS)
        .with_mode(list_detail("a.more", Some("a.next")));
    let outcome = coordinator(config, Arc::new(ScriptedRenderer::new())).run().await;

    assert_eq!(
        outcome.termination,
        Termination::Completed(DoneReason::NavigationNotFound)
    );
    assert_eq!(column(&outcome.records, "Name"), vec!["first", "second"]);
    assert_eq!(column(&outcome.records, "CEO"), vec!["Ann", "Bob"]);
    assert_eq!(outcome.stats.list_pages, 2);
    assert_eq!(outcome.stats.detail_pages, 2);
}
