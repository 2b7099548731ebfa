//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and exercise the
//! full crawl cycle end-to-end: page-1 extraction, endpoint discovery,
//! pagination, checkpointing, and failure behavior. Politeness pauses and
//! backoff are configured to zero so the suite runs fast.

use tempfile::TempDir;
use veranda::checkpoint::CheckpointStore;
use veranda::config::{CrawlerConfig, SiteConfig};
use veranda::crawler::{Crawler, Fetcher};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds `count` listing items with predictable titles and URLs.
fn listings_fixture(prefix: &str, count: usize) -> serde_json::Value {
    let items: Vec<serde_json::Value> = (0..count)
        .map(|i| {
            serde_json::json!({
                "title": format!("{prefix} {i}"),
                "price": "₹ 45 L",
                "size": "1,000 sq.ft.",
                "locality": "Vyttila",
                "bhk": 2,
                "url": format!("/p/{prefix}-{i}")
            })
        })
        .collect();
    serde_json::json!(items)
}

/// Page-1 HTML with an embedded state payload and an API endpoint hint.
fn page1_html(embedded_count: usize, api_endpoint: &str) -> String {
    let state = serde_json::json!({
        "searchCity": {
            "searchCityData": {
                "listings": listings_fixture("embedded", embedded_count)
            }
        }
    });
    format!(
        "<html><head><title>Search</title></head><body>\n\
         <script>window.__PRELOADED_STATE__ = {state};</script>\n\
         <script>var bootstrap = {{\"apiEndpoint\": \"{api_endpoint}\"}};</script>\n\
         </body></html>"
    )
}

/// Page-1 HTML whose scripts never mention the pagination endpoint.
fn page1_html_without_endpoint(embedded_count: usize) -> String {
    let state = serde_json::json!({
        "searchCity": {
            "searchCityData": {
                "listings": listings_fixture("embedded", embedded_count)
            }
        }
    });
    format!(
        "<html><head><title>Search</title></head><body>\n\
         <script>window.__PRELOADED_STATE__ = {state};</script>\n\
         </body></html>"
    )
}

fn api_body(prefix: &str, count: usize) -> String {
    serde_json::json!({ "listings": listings_fixture(prefix, count) }).to_string()
}

/// Creates a crawler against the mock server with test-friendly timing.
fn test_crawler(base_url: &str, store: CheckpointStore, max_pages: u32) -> Crawler {
    let crawler_config = CrawlerConfig {
        retry_attempts: 2,
        backoff_cap_secs: 0,
        min_pause_ms: 0,
        max_pause_ms: 0,
        ..CrawlerConfig::default()
    };
    let site = SiteConfig {
        search_url: format!("{base_url}/search?city=138&page=1"),
        origin: base_url.to_string(),
    };
    let fetcher = Fetcher::from_config(&crawler_config, None).expect("Failed to build client");
    Crawler::new(fetcher, store, &site, max_pages)
}

async fn mount_page1(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_api_page(server: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/api/propertySearchListingJSON"))
        .and(query_param("page", page))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_end_to_end_collects_both_sources() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let api_endpoint = format!("{base_url}/api/propertySearchListingJSON?city=138&page=1");

    // Page 1 carries 20 embedded listings plus the endpoint hint
    mount_page1(&mock_server, page1_html(20, &api_endpoint)).await;

    // API serves one full page, then an empty one
    mount_api_page(&mock_server, "2", api_body("api", 10)).await;
    mount_api_page(&mock_server, "3", api_body("api", 0)).await;

    // Pagination must stop at the empty page
    Mock::given(method("GET"))
        .and(path("/api/propertySearchListingJSON"))
        .and(query_param("page", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_string(api_body("api", 10)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("visited.db");
    let store = CheckpointStore::open(&db_path).expect("Failed to open store");

    let crawler = test_crawler(&base_url, store, 50);
    let report = crawler.crawl().await.expect("Crawl failed");
    drop(crawler);

    // 20 embedded then 10 API records, in page order
    assert_eq!(report.records.len(), 30);
    assert_eq!(report.embedded_count, 20);
    assert_eq!(report.api_pages_fetched, 2);
    assert!(report.endpoint_resolved);
    assert!(report.page1_error.is_none());

    assert_eq!(report.records[0].title.as_deref(), Some("embedded 0"));
    assert_eq!(report.records[19].title.as_deref(), Some("embedded 19"));
    assert_eq!(report.records[20].title.as_deref(), Some("api 0"));
    assert_eq!(report.records[29].title.as_deref(), Some("api 9"));

    // Listing URLs are absolutized against the origin
    assert_eq!(
        report.records[0].detail_url.as_deref(),
        Some(format!("{base_url}/p/embedded-0").as_str())
    );

    // Only the non-empty API page is checkpointed; embedded rows are not
    let verify = CheckpointStore::open(&db_path).expect("Failed to reopen store");
    assert_eq!(verify.len().unwrap(), 10);
    assert!(verify
        .has_seen(&format!("{base_url}/p/api-0"))
        .unwrap());
    assert!(!verify
        .has_seen(&format!("{base_url}/p/embedded-0"))
        .unwrap());
}

#[tokio::test]
async fn test_pagination_stops_at_first_empty_page() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let api_endpoint = format!("{base_url}/api/propertySearchListingJSON?city=138&page=1");

    mount_page1(&mock_server, page1_html(2, &api_endpoint)).await;
    mount_api_page(&mock_server, "2", api_body("page2", 3)).await;
    mount_api_page(&mock_server, "3", api_body("page3", 2)).await;
    mount_api_page(&mock_server, "4", api_body("page4", 0)).await;

    // Page 5 exists server-side but must never be requested
    Mock::given(method("GET"))
        .and(path("/api/propertySearchListingJSON"))
        .and(query_param("page", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_string(api_body("page5", 7)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let store = CheckpointStore::in_memory().expect("Failed to open store");
    let crawler = test_crawler(&base_url, store, 50);
    let report = crawler.crawl().await.expect("Crawl failed");

    assert_eq!(report.records.len(), 2 + 3 + 2);
    assert_eq!(report.api_pages_fetched, 3);
}

#[tokio::test]
async fn test_page1_failure_yields_empty_report() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Every attempt gets a 500; the retry budget is 2
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    let store = CheckpointStore::in_memory().expect("Failed to open store");
    let crawler = test_crawler(&base_url, store, 50);
    let report = crawler.crawl().await.expect("Crawl itself must not fail");

    assert!(report.records.is_empty());
    assert_eq!(report.embedded_count, 0);
    assert_eq!(report.api_pages_fetched, 0);
    assert!(!report.endpoint_resolved);
    let error = report.page1_error.expect("page-1 failure should be recorded");
    assert!(error.contains("500"), "unexpected error text: {error}");
}

#[tokio::test]
async fn test_missing_endpoint_keeps_embedded_rows() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page1(&mock_server, page1_html_without_endpoint(5)).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("visited.db");
    let store = CheckpointStore::open(&db_path).expect("Failed to open store");

    let crawler = test_crawler(&base_url, store, 50);
    let report = crawler.crawl().await.expect("Crawl failed");
    drop(crawler);

    assert_eq!(report.records.len(), 5);
    assert_eq!(report.embedded_count, 5);
    assert!(!report.endpoint_resolved);
    assert_eq!(report.api_pages_fetched, 0);
    assert!(report.page1_error.is_none());

    // Nothing was checkpointed: embedded rows are never marked
    let verify = CheckpointStore::open(&db_path).expect("Failed to reopen store");
    assert_eq!(verify.len().unwrap(), 0);
}

#[tokio::test]
async fn test_recrawl_suppresses_previously_ingested_rows() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let api_endpoint = format!("{base_url}/api/propertySearchListingJSON?city=138&page=1");

    mount_page1(&mock_server, page1_html(3, &api_endpoint)).await;
    mount_api_page(&mock_server, "2", api_body("api", 4)).await;
    mount_api_page(&mock_server, "3", api_body("api", 0)).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("visited.db");

    let store = CheckpointStore::open(&db_path).expect("Failed to open store");
    let first = test_crawler(&base_url, store, 50)
        .crawl()
        .await
        .expect("First crawl failed");
    assert_eq!(first.records.len(), 3 + 4);

    // The second crawl sees identical pages; the API rows are already in
    // the visited set, the embedded rows are re-emitted by design
    let store = CheckpointStore::open(&db_path).expect("Failed to reopen store");
    let second = test_crawler(&base_url, store, 50)
        .crawl()
        .await
        .expect("Second crawl failed");

    assert_eq!(second.records.len(), 3);
    assert_eq!(second.embedded_count, 3);
    assert_eq!(second.api_pages_fetched, 2);

    let verify = CheckpointStore::open(&db_path).expect("Failed to reopen store");
    assert_eq!(verify.len().unwrap(), 4);
}

#[tokio::test]
async fn test_retry_recovers_after_transient_failure() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // First attempt fails, the retry succeeds
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_page1(&mock_server, page1_html_without_endpoint(2)).await;

    let store = CheckpointStore::in_memory().expect("Failed to open store");
    let crawler = test_crawler(&base_url, store, 50);
    let report = crawler.crawl().await.expect("Crawl failed");

    assert_eq!(report.records.len(), 2);
    assert!(report.page1_error.is_none());
}

#[tokio::test]
async fn test_api_page_failure_keeps_prior_rows() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let api_endpoint = format!("{base_url}/api/propertySearchListingJSON?city=138&page=1");

    mount_page1(&mock_server, page1_html(2, &api_endpoint)).await;
    mount_api_page(&mock_server, "2", api_body("api", 3)).await;

    // Page 3 dies on every attempt; the walk stops there
    Mock::given(method("GET"))
        .and(path("/api/propertySearchListingJSON"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let store = CheckpointStore::in_memory().expect("Failed to open store");
    let crawler = test_crawler(&base_url, store, 50);
    let report = crawler.crawl().await.expect("Crawl failed");

    assert_eq!(report.records.len(), 2 + 3);
    // Only the page that actually arrived is counted
    assert_eq!(report.api_pages_fetched, 1);
    assert!(report.endpoint_resolved);
    assert!(report.page1_error.is_none());
}

#[tokio::test]
async fn test_crawl_command_aborts_without_touching_dataset() {
    let mock_server = MockServer::start().await;

    // Every fetch attempt gets a 500
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();

    // Dataset left behind by an earlier successful crawl
    let raw_path = dir.path().join("raw.csv");
    std::fs::write(
        &raw_path,
        "title,price,area,locality,bedrooms,detail_url,scraped_at\n\
         earlier-run,,,,,,2026-08-01T00:00:00+00:00\n",
    )
    .unwrap();

    let config_path = dir.path().join("veranda.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"[site]
search-url = "{uri}/search?city=138&page=1"
origin = "{uri}"

[crawler]
retry-attempts = 2
backoff-cap-secs = 0
min-pause-ms = 0
max-pause-ms = 0

[output]
raw-path = "{raw}"
clean-path = "{root}/clean.csv"
checkpoint-path = "{root}/checkpoint.db"
html-archive-dir = "{root}/html"
model-path = "{root}/model.json"
"#,
            uri = mock_server.uri(),
            raw = raw_path.display(),
            root = dir.path().display(),
        ),
    )
    .unwrap();

    let output = tokio::task::spawn_blocking(move || {
        std::process::Command::new(env!("CARGO_BIN_EXE_veranda"))
            .arg("--config")
            .arg(&config_path)
            .arg("--quiet")
            .arg("crawl")
            .output()
    })
    .await
    .unwrap()
    .expect("Failed to run the crawl binary");

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("saved"), "unexpected stdout: {stdout}");

    // The earlier dataset survives the aborted crawl untouched
    let raw = std::fs::read_to_string(&raw_path).unwrap();
    assert!(raw.contains("earlier-run"));
}
