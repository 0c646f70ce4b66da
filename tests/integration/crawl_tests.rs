//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end: HTTP browser, artifact directory and
//! record database.

use std::path::Path;
use tablecrawl::config::Config;
use tablecrawl::crawler::run_crawl;
use tablecrawl::output::load_statistics;
use tablecrawl::storage::RunStatus;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Renders a listing page with `rows` data rows and extra markup after the table
fn listing(tag: &str, rows: usize, after_table: &str) -> String {
    let body: String = (0..rows)
        .map(|i| format!("<tr><td>{}-{}</td><td>Item {}</td></tr>", tag, i, i))
        .collect();
    format!(
        r#"<html><head><title>{}</title></head><body>
        <table><tr><th>Id</th><th>Name</th></tr>{}</table>
        {}
        </body></html>"#,
        tag, body, after_table
    )
}

fn next_link(href: &str) -> String {
    format!(r#"<ul class="pagination"><li><a rel="next" href="{}">Next</a></li></ul>"#, href)
}

async fn mount_page(server: &MockServer, route: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Creates a test configuration rooted at `start_url` writing into `dir`
fn create_test_config(start_url: String, dir: &Path) -> Config {
    let mut config = Config::default();
    config.crawler.start_url = Some(start_url);
    config.crawler.max_concurrency = 2;
    config.crawler.max_request_retries = 1;
    config.crawler.retry_delay_ms = 10;
    config.crawler.recovery_delay_ms = 10;
    config.crawler.navigation_timeout_ms = 5_000;
    config.crawler.stabilize_timeout_ms = 5_000;
    config.user_agent.crawler_name = "TestBot".to_string();
    config.output.artifact_dir = dir.join("artifacts").to_string_lossy().into_owned();
    config.output.database_path = dir.join("records.db").to_string_lossy().into_owned();
    config
}

fn artifact_files(config: &Config) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(&config.output.artifact_dir)
        .expect("artifact dir exists")
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_full_crawl_follows_pagination() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/p1", listing("a", 25, &next_link("/p2"))).await;
    mount_page(&server, "/p2", listing("b", 5, &next_link("/p3"))).await;
    mount_page(&server, "/p3", listing("c", 3, "")).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(format!("{}/p1", base), dir.path());
    let summary_path = dir.path().join("summary.md");
    config.output.summary_path = Some(summary_path.to_string_lossy().into_owned());

    let report = run_crawl(config.clone(), "test-hash")
        .await
        .expect("crawl should finish");

    // Header rows are table rows too
    assert_eq!(report.targets_dispatched, 3);
    assert_eq!(report.targets_completed, 3);
    assert!(report.failed.is_empty());
    assert_eq!(report.rows_found, 26 + 6 + 4);
    assert_eq!(report.chunks_built, 2 + 1 + 1);
    assert!(report.run_id.is_some());

    let files = artifact_files(&config);
    assert_eq!(files.len(), 7);
    assert_eq!(files.iter().filter(|f| f.starts_with("raw_")).count(), 3);
    assert_eq!(files.iter().filter(|f| f.contains("_chunk_")).count(), 4);
    assert!(files.iter().all(|f| f.ends_with(".html")));

    let stats = load_statistics(Path::new(&config.output.database_path)).unwrap();
    assert_eq!(stats.total_runs, 1);
    assert_eq!(stats.row_records, 36);
    assert_eq!(stats.chunk_records, 4);
    assert_eq!(stats.distinct_urls, 3);
    assert_eq!(stats.failed_targets, 0);

    let run = stats.latest_run.expect("run recorded");
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");
    assert_eq!(run.targets_completed, 3);
    assert_eq!(run.rows_found, 36);

    let summary = std::fs::read_to_string(&summary_path).unwrap();
    assert!(summary.contains("| Rows found | 36 |"));
}

#[tokio::test]
async fn test_page_cap_limits_dispatch() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/p1", listing("a", 2, &next_link("/p2"))).await;
    mount_page(&server, "/p2", listing("b", 2, &next_link("/p3"))).await;
    Mock::given(method("GET"))
        .and(path("/p3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing("c", 2, "")))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(format!("{}/p1", base), dir.path());
    config.crawler.max_pages = 2;

    let report = run_crawl(config, "test-hash").await.unwrap();

    assert_eq!(report.targets_dispatched, 2);
    assert_eq!(report.targets_completed, 2);
    assert!(report.page_cap_reached);
    assert_eq!(report.frontier_remaining, 1);
}

#[tokio::test]
async fn test_failing_page_does_not_halt_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/p1",
        listing(
            "a",
            3,
            r#"<a class="detail" href="/broken">Broken</a>
               <a class="detail" href="/p2">Second</a>"#,
        ),
    )
    .await;
    mount_page(&server, "/p2", listing("b", 3, "")).await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(format!("{}/p1", base), dir.path());
    config.crawler.follow_selector = Some("a.detail".to_string());

    let report = run_crawl(config.clone(), "test-hash").await.unwrap();

    assert_eq!(report.targets_dispatched, 3);
    assert_eq!(report.targets_completed, 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].url, format!("{}/broken", base));
    assert_eq!(report.failed[0].attempts, 2);
    assert!(report.failed[0].message.contains("500"));

    let stats = load_statistics(Path::new(&config.output.database_path)).unwrap();
    assert_eq!(stats.failed_targets, 1);
    assert_eq!(stats.distinct_urls, 2);
}

#[tokio::test]
async fn test_robots_disallowed_page_is_skipped() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/p1",
        listing(
            "a",
            1,
            r#"<a class="detail" href="/private/report">Private</a>
               <a class="detail" href="/p2">Public</a>"#,
        ),
    )
    .await;
    mount_page(&server, "/p2", listing("b", 1, "")).await;
    Mock::given(method("GET"))
        .and(path("/private/report"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing("x", 1, "")))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(format!("{}/p1", base), dir.path());
    config.crawler.follow_selector = Some("a.detail".to_string());
    config.crawler.respect_robots_txt = true;

    let report = run_crawl(config, "test-hash").await.unwrap();

    assert_eq!(report.targets_dispatched, 2);
    assert_eq!(report.targets_completed, 2);
    assert_eq!(
        report.skipped_by_robots,
        vec![format!("{}/private/report", base)]
    );
}
