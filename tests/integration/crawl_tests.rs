//! Integration tests for the crawler
//!
//! These tests use wiremock to serve listing and detail pages and run the
//! full crawl cycle end-to-end against a CSV output.

use page_harvester::config::{Config, OutputFormat};
use page_harvester::crawler::{Coordinator, FetchError, HttpListingSource, ListingSource};
use page_harvester::storage::{CsvSink, RecordSink, NOT_AVAILABLE};
use page_harvester::HarvestError;
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TARGET: &str = "uploader";

/// Creates a test configuration pointed at the mock server
fn create_test_config(base_url: &str, output: &Path, start: u32, end: u32) -> Config {
    let mut config = Config::default();
    config.crawler.start_page = start;
    config.crawler.end_page = end;
    config.crawler.max_retries = 1;
    config.crawler.retry_delay_ms = 0;
    config.crawler.pacing_min_ms = 0;
    config.crawler.pacing_max_ms = 0;
    config.crawler.max_workers = 4;
    config.source.target_id = TARGET.to_string();
    config.source.base_url = base_url.to_string();
    config.source.request_timeout_secs = 5;
    config.user_agent.crawler_name = "TestBot".to_string();
    config.output.format = OutputFormat::Csv;
    config.output.path = Some(output.display().to_string());
    config
}

fn listing_html(ids: &[u32]) -> String {
    let rows: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<tr><td class="name"><a href="/sub/1/0/" class="icon"></a><a href="/torrent/{id}/item-{id}/">Item {id}</a></td></tr>"#
            )
        })
        .collect();
    format!("<html><body><table class=\"table-list\">{rows}</table></body></html>")
}

fn detail_html(id: u32, with_magnet: bool) -> String {
    let magnet = if with_magnet {
        format!(r#"<a href="magnet:?xt=urn:btih:{id:040}">Magnet Download</a>"#)
    } else {
        String::new()
    };
    format!(
        r#"<html><body>
            <div class="box-info-heading"><h1>Item {id}</h1></div>
            <ul class="list">
              <li><strong>Category</strong> <span>Movies</span></li>
              <li><strong>Type</strong> <span>HD</span></li>
              <li><strong>Language</strong> <span>English</span></li>
              <li><strong>Total size</strong> <span>{id} MB</span></li>
            </ul>
            {magnet}
        </body></html>"#
    )
}

async fn mount_listing(server: &MockServer, page: u32, ids: &[u32]) {
    Mock::given(method("GET"))
        .and(path(format!("/{}-torrents/{}/", TARGET, page)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_html(ids))
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, id: u32, delay_ms: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/torrent/{id}/item-{id}/")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(detail_html(id, true))
                .insert_header("content-type", "text/html")
                .set_delay(Duration::from_millis(delay_ms)),
        )
        .mount(server)
        .await;
}

fn collected_keys(output: &Path) -> Vec<String> {
    CsvSink::open(output)
        .expect("Failed to reopen output")
        .load_records()
        .expect("Failed to read output")
        .into_iter()
        .map(|record| record.item_key)
        .collect()
}

#[tokio::test]
async fn test_full_crawl_preserves_page_order() {
    let mock_server = MockServer::start().await;

    mount_listing(&mock_server, 2, &[201, 202, 203]).await;
    mount_listing(&mock_server, 1, &[101]).await;
    // The first item on page 2 answers last
    mount_detail(&mock_server, 201, 300).await;
    mount_detail(&mock_server, 202, 0).await;
    mount_detail(&mock_server, 203, 50).await;
    mount_detail(&mock_server, 101, 0).await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("records.csv");
    let config = create_test_config(&mock_server.uri(), &output, 2, 1);

    let mut coordinator = Coordinator::from_config(&config).expect("Failed to create coordinator");
    let report = coordinator.run().await.expect("Crawl failed");

    assert_eq!(report.pages_succeeded, 2);
    assert_eq!(report.records_added, 4);
    assert_eq!(collected_keys(&output), vec!["201", "202", "203", "101"]);

    let content = std::fs::read_to_string(&output).unwrap();
    let mut lines = content.lines();
    assert_eq!(
        lines.next(),
        Some("page_number,sub_page_id,title,file_size,category,magnet_link")
    );
    let first = lines.next().unwrap();
    assert!(first.starts_with("2,201,Item 201,201 MB,Movies,magnet:?xt=urn:btih:"));
}

#[tokio::test]
async fn test_rerun_against_same_output_adds_nothing() {
    let mock_server = MockServer::start().await;

    mount_listing(&mock_server, 1, &[11, 12]).await;
    mount_detail(&mock_server, 11, 0).await;
    mount_detail(&mock_server, 12, 0).await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("records.csv");
    let config = create_test_config(&mock_server.uri(), &output, 1, 1);

    let first = Coordinator::from_config(&config)
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(first.records_added, 2);

    let second = Coordinator::from_config(&config)
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(second.records_added, 0);
    assert_eq!(second.duplicates_skipped, 2);

    assert_eq!(collected_keys(&output), vec!["11", "12"]);
}

#[tokio::test]
async fn test_missing_fields_stored_as_not_available() {
    let mock_server = MockServer::start().await;

    mount_listing(&mock_server, 1, &[7]).await;
    Mock::given(method("GET"))
        .and(path("/torrent/7/item-7/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html(7, false)))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("records.csv");
    let config = create_test_config(&mock_server.uri(), &output, 1, 1);

    Coordinator::from_config(&config)
        .unwrap()
        .run()
        .await
        .unwrap();

    let records = CsvSink::open(&output).unwrap().load_records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "Item 7");
    assert_eq!(records[0].magnet_link, NOT_AVAILABLE);
}

#[tokio::test]
async fn test_unreachable_detail_stops_crawl() {
    let mock_server = MockServer::start().await;

    mount_listing(&mock_server, 3, &[31]).await;
    mount_listing(&mock_server, 2, &[21, 22]).await;
    mount_detail(&mock_server, 31, 0).await;
    mount_detail(&mock_server, 21, 0).await;

    // One try plus one retry
    Mock::given(method("GET"))
        .and(path("/torrent/22/item-22/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("records.csv");
    let config = create_test_config(&mock_server.uri(), &output, 3, 1);

    let result = Coordinator::from_config(&config).unwrap().run().await;

    match result {
        Err(e @ HarvestError::DetailExhausted { .. }) => {
            assert_eq!(e.exit_code(), 3);
            if let HarvestError::DetailExhausted {
                page_number,
                attempts,
                ..
            } = e
            {
                assert_eq!(page_number, 2);
                assert_eq!(attempts, 2);
            }
        }
        other => panic!("expected detail exhaustion, got {:?}", other),
    }

    // Page 3 was saved before the failure; nothing from page 2 was
    assert_eq!(collected_keys(&output), vec!["31"]);
}

#[tokio::test]
async fn test_missing_listing_pages_open_circuit() {
    let mock_server = MockServer::start().await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("records.csv");
    let mut config = create_test_config(&mock_server.uri(), &output, 5, 1);
    config.crawler.max_retries = 0;
    config.crawler.max_consecutive_failures = 2;

    let result = Coordinator::from_config(&config).unwrap().run().await;

    assert!(matches!(
        result,
        Err(HarvestError::CircuitOpen {
            consecutive_failures: 2,
            last_page: 4
        })
    ));
    assert!(collected_keys(&output).is_empty());
}

#[tokio::test]
async fn test_blocked_status_classified() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/{}-torrents/9/", TARGET)))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), &dir.path().join("x.csv"), 9, 9);
    let source = HttpListingSource::new(&config).unwrap();

    match source.fetch_page(9).await {
        Err(FetchError::Blocked { status, .. }) => assert_eq!(status, 429),
        other => panic!("expected blocked error, got {:?}", other.map(|p| p.url)),
    }
}

#[tokio::test]
async fn test_empty_existing_output_gets_header() {
    let mock_server = MockServer::start().await;

    mount_listing(&mock_server, 1, &[5]).await;
    mount_detail(&mock_server, 5, 0).await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("records.csv");
    std::fs::write(&output, "").unwrap();
    let config = create_test_config(&mock_server.uri(), &output, 1, 1);

    let report = Coordinator::from_config(&config)
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(report.records_added, 1);

    let content = std::fs::read_to_string(&output).unwrap();
    assert!(content.starts_with("page_number,sub_page_id,title,file_size,category,magnet_link\n1,5,"));
    assert_eq!(collected_keys(&output), vec!["5"]);
}
