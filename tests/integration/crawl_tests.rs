//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use ripple_index::config::{
    Config, CrawlerConfig, DispatchConfig, DispatchMode, FilterConfig, OutputConfig,
    ServerConfig, UserAgentConfig,
};
use ripple_index::crawler::{Admission, Coordinator, Origin, SessionMode};
use ripple_index::storage::{SessionStatus, SqliteStorage, Storage};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration restricted to the mock host and `/wiki/`
fn create_test_config(max_depth: u32, max_fan_out: usize, db_path: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_depth,
            max_fan_out,
            worker_count: 4,
            queue_capacity: 100,
            request_timeout_ms: 2_000,
            session_timeout_secs: 30,
            flush_interval_secs: 0,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        filter: FilterConfig {
            allowed_hosts: vec!["127.0.0.1".to_string()],
            path_prefix: Some("/wiki/".to_string()),
            deny_segments: vec!["login".to_string(), "category".to_string()],
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
        },
        dispatch: DispatchConfig::default(),
        server: ServerConfig::default(),
        seeds: vec![],
    }
}

struct TestDb {
    _dir: TempDir,
    path: String,
    storage: Arc<SqliteStorage>,
}

fn test_db() -> TestDb {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("ripple.db");
    let storage = Arc::new(SqliteStorage::new(&path).expect("Failed to open database"));
    TestDb {
        path: path.to_string_lossy().to_string(),
        _dir: dir,
        storage,
    }
}

fn coordinator(config: &Config, db: &TestDb, mode: SessionMode) -> Coordinator {
    let storage: Arc<dyn Storage> = db.storage.clone();
    Coordinator::new(config, storage, "test-hash", mode).expect("Failed to create coordinator")
}

async fn mount_page(server: &MockServer, route: &str, html: String, expected: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html"))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_depth_one_crawl_fetches_exactly_seed_and_children() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/wiki/A",
        r#"<html><head><title>Page A</title></head><body>
            <p>alpha alpha shared</p>
            <a href="/wiki/B">to b</a>
            <a href="/wiki/C">to c</a>
            <a href="/other/D">to d</a>
        </body></html>"#
            .to_string(),
        1,
    )
    .await;
    mount_page(
        &server,
        "/wiki/B",
        r#"<html><body><p>beta shared</p><a href="/wiki/E">deeper</a><a href="/wiki/A">back</a></body></html>"#
            .to_string(),
        1,
    )
    .await;
    mount_page(
        &server,
        "/wiki/C",
        r#"<html><body><p>gamma</p></body></html>"#.to_string(),
        1,
    )
    .await;
    mount_page(&server, "/other/D", "<p>delta</p>".to_string(), 0).await;
    mount_page(&server, "/wiki/E", "<p>epsilon</p>".to_string(), 0).await;

    let db = test_db();
    let config = create_test_config(1, 10, &db.path);
    let report = coordinator(&config, &db, SessionMode::Batch)
        .run(&[format!("{}/wiki/A", base)])
        .await
        .expect("Crawl failed");

    assert_eq!(report.status, SessionStatus::Completed);
    assert_eq!(report.workers.pages_indexed, 3);
    assert_eq!(report.workers.pages_failed, 0);

    let a = format!("{}/wiki/A", base);
    let b = format!("{}/wiki/B", base);
    let c = format!("{}/wiki/C", base);
    let storage = &db.storage;

    assert_eq!(storage.index_frequency("alpha", &a).unwrap(), Some(2));
    assert_eq!(storage.index_frequency("beta", &b).unwrap(), Some(1));
    assert_eq!(storage.index_frequency("gamma", &c).unwrap(), Some(1));
    assert_eq!(storage.index_frequency("alpha", &b).unwrap(), None);
    assert_eq!(storage.index_frequency("delta", &a).unwrap(), None);
    assert!(storage.count_words().unwrap() > 0);

    let mut shared = storage.postings_for_word("shared").unwrap();
    shared.sort();
    assert_eq!(shared, vec![(a.clone(), 1), (b.clone(), 1)]);

    assert_eq!(storage.count_pages().unwrap(), 3);
    assert_eq!(
        storage.get_page(&a).unwrap().unwrap().title.as_deref(),
        Some("Page A")
    );
    assert_eq!(storage.count_visited().unwrap(), 3);
}

#[tokio::test]
async fn test_depth_bound_on_chain() {
    let server = MockServer::start().await;
    let base = server.uri();

    for i in 0..4 {
        let html = format!(r#"<body><p>step</p><a href="/wiki/{}">next</a></body>"#, i + 1);
        let expected = if i <= 2 { 1 } else { 0 };
        mount_page(&server, &format!("/wiki/{}", i), html, expected).await;
    }

    let db = test_db();
    let config = create_test_config(2, 10, &db.path);
    let coordinator = coordinator(&config, &db, SessionMode::Batch);
    let report = coordinator
        .run(&[format!("{}/wiki/0", base)])
        .await
        .expect("Crawl failed");

    assert_eq!(report.workers.pages_indexed, 3);
    assert_eq!(
        coordinator.frontier().state_of(&format!("{}/wiki/3", base)),
        None
    );
}

#[tokio::test]
async fn test_fan_out_cap_limits_admitted_links() {
    let server = MockServer::start().await;
    let base = server.uri();

    let links: String = (0..6)
        .map(|i| format!(r#"<a href="/wiki/Leaf{}">leaf</a>"#, i))
        .collect();
    mount_page(&server, "/wiki/Hub", format!("<body>{}</body>", links), 1).await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/wiki/Leaf\d$"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>leaf</p>", "text/html"))
        .expect(2)
        .mount(&server)
        .await;

    let db = test_db();
    let config = create_test_config(3, 2, &db.path);
    let report = coordinator(&config, &db, SessionMode::Batch)
        .run(&[format!("{}/wiki/Hub", base)])
        .await
        .expect("Crawl failed");

    assert_eq!(report.workers.links_admitted, 2);
    assert_eq!(report.workers.pages_indexed, 3);
}

#[tokio::test]
async fn test_failed_pages_do_not_block_traversal() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/wiki/Start",
        r#"<body><a href="/wiki/Missing">gone</a><a href="/wiki/Image">img</a><a href="/wiki/Fine">ok</a></body>"#
            .to_string(),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/wiki/Missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wiki/Image"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 16], "image/png"))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/wiki/Fine", "<p>fine words</p>".to_string(), 1).await;

    let db = test_db();
    let config = create_test_config(2, 10, &db.path);
    let report = coordinator(&config, &db, SessionMode::Batch)
        .run(&[format!("{}/wiki/Start", base)])
        .await
        .expect("Crawl failed");

    assert_eq!(report.workers.pages_indexed, 2);
    assert_eq!(report.workers.pages_failed, 2);

    let missing = format!("{}/wiki/Missing", base);
    assert!(db.storage.get_page(&missing).unwrap().is_none());
    assert_eq!(
        db.storage
            .index_frequency("fine", &format!("{}/wiki/Fine", base))
            .unwrap(),
        Some(1)
    );

    let session = db.storage.latest_session().unwrap().unwrap();
    assert_eq!(session.summary.pages_failed, 2);
}

#[tokio::test]
async fn test_enqueue_beyond_capacity_reports_drops() {
    let db = test_db();
    let mut config = create_test_config(2, 10, &db.path);
    config.crawler.queue_capacity = 3;

    // Service mode without running the pool: nothing is dequeued.
    let coordinator = coordinator(&config, &db, SessionMode::Service);

    let admissions: Vec<Admission> = (0..10)
        .map(|i| {
            coordinator
                .enqueue(&format!("http://127.0.0.1/wiki/{}", i), 0, Origin::Remote)
                .unwrap()
        })
        .collect();

    let accepted = admissions.iter().filter(|a| a.is_accepted()).count();
    let dropped = admissions
        .iter()
        .filter(|a| **a == Admission::QueueFull)
        .count();
    assert_eq!(accepted, 3);
    assert_eq!(dropped, 7);

    let health = coordinator.health();
    assert_eq!(health.frontier.dropped, 7);
    assert_eq!(health.pending, 3);
}

#[tokio::test]
async fn test_remote_dispatch_forwards_links_to_peer() {
    let server = MockServer::start().await;
    let peer = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/wiki/Root",
        r#"<body><p>root</p><a href="/wiki/B">b</a><a href="/wiki/C#frag">c</a><a href="/wiki/C">c</a></body>"#
            .to_string(),
        1,
    )
    .await;
    mount_page(&server, "/wiki/B", "<p>b</p>".to_string(), 0).await;
    mount_page(&server, "/wiki/C", "<p>c</p>".to_string(), 0).await;

    Mock::given(method("GET"))
        .and(path("/crawl"))
        .and(query_param("depth", "1"))
        .respond_with(ResponseTemplate::new(202))
        .expect(2)
        .mount(&peer)
        .await;

    let db = test_db();
    let mut config = create_test_config(2, 10, &db.path);
    config.dispatch = DispatchConfig {
        mode: DispatchMode::Remote,
        peer: Some(peer.uri()),
        shared_seen: false,
    };

    let report = coordinator(&config, &db, SessionMode::Batch)
        .run(&[format!("{}/wiki/Root", base)])
        .await
        .expect("Crawl failed");

    assert_eq!(report.workers.pages_indexed, 1);
    assert_eq!(report.workers.links_forwarded, 2);
    assert_eq!(report.workers.forward_failures, 0);
}

#[tokio::test]
async fn test_repeated_sessions_accumulate_frequencies() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(&server, "/wiki/Page", "<p>echo echo</p>".to_string(), 2).await;

    let db = test_db();
    let config = create_test_config(1, 10, &db.path);
    let seed = format!("{}/wiki/Page", base);

    for _ in 0..2 {
        coordinator(&config, &db, SessionMode::Batch)
            .run(&[seed.clone()])
            .await
            .expect("Crawl failed");
    }

    assert_eq!(db.storage.index_frequency("echo", &seed).unwrap(), Some(4));
    assert_eq!(db.storage.count_sessions().unwrap(), 2);
    assert_eq!(db.storage.count_pages().unwrap(), 1);
}

#[tokio::test]
async fn test_shared_visited_set_skips_pages_seen_by_other_units() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(&server, "/wiki/Once", "<p>once</p>".to_string(), 1).await;

    let db = test_db();
    let mut config = create_test_config(1, 10, &db.path);
    config.dispatch.shared_seen = true;
    let seed = format!("{}/wiki/Once", base);

    let first = coordinator(&config, &db, SessionMode::Batch)
        .run(&[seed.clone()])
        .await
        .expect("Crawl failed");
    let second = coordinator(&config, &db, SessionMode::Batch)
        .run(&[seed.clone()])
        .await
        .expect("Crawl failed");

    assert_eq!(first.workers.pages_indexed, 1);
    assert_eq!(second.workers.pages_skipped, 1);
    assert_eq!(db.storage.index_frequency("once", &seed).unwrap(), Some(1));
}

#[tokio::test]
async fn test_session_timeout_lets_in_flight_page_finish() {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/wiki/Slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(
                    r#"<p>slow</p><a href="/wiki/Late">late</a><a href="/wiki/Later">later</a>"#,
                    "text/html",
                )
                .set_delay(std::time::Duration::from_millis(1_500)),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/wiki/Late", "<p>late</p>".to_string(), 0).await;
    mount_page(&server, "/wiki/Later", "<p>later</p>".to_string(), 0).await;

    let db = test_db();
    let mut config = create_test_config(2, 10, &db.path);
    config.crawler.session_timeout_secs = 1;
    let seed = format!("{}/wiki/Slow", base);

    let coordinator = coordinator(&config, &db, SessionMode::Batch);
    let report = coordinator.run(&[seed.clone()]).await.expect("Crawl failed");

    assert_eq!(report.status, SessionStatus::TimedOut);
    assert_eq!(report.workers.pages_indexed, 1);
    assert_eq!(report.frontier.dropped, 2);
    assert!(coordinator.frontier().is_closed());
    assert_eq!(coordinator.frontier().pending(), 0);
    assert_eq!(db.storage.index_frequency("slow", &seed).unwrap(), Some(1));

    let session = db.storage.latest_session().unwrap().expect("No session recorded");
    assert_eq!(session.status, SessionStatus::TimedOut);
    assert_eq!(session.summary.links_dropped, 2);
}
