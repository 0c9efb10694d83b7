use super::*;
use crate::config::{Config, FilterRuleConfig, TransmissionConfig};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path as url_path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAYLOAD: &[u8] = b"d8:announce35:http://tracker.example.com/announcee";

fn transmission_for(server: &MockServer) -> TransmissionConfig {
    let uri = url::Url::parse(&server.uri()).expect("mock server uri");
    TransmissionConfig {
        host: uri.host_str().expect("mock host").to_string(),
        port: uri.port().expect("mock port"),
        auth: None,
    }
}

/// Build an agent whose state file lives in `state_dir` and whose daemon is
/// the given mock server. Bootstraps the state file on first use.
fn agent_for(state_dir: &TempDir, rpc: &MockServer, filters: Vec<FilterRuleConfig>) -> FeedAgent {
    let state_file = state_dir.path().join("state.txt");
    if !state_file.exists() {
        DedupStore::create(&state_file).expect("bootstrap state file");
    }
    let config = Config {
        transmission: transmission_for(rpc),
        state_file,
        filters,
        http_timeout: Duration::from_secs(5),
    };
    FeedAgent::new(&config).expect("agent construction")
}

fn tv_rule(feed_id: Option<&str>) -> FilterRuleConfig {
    FilterRuleConfig {
        pattern: r"(?i)s\d{2}e\d{2}".to_string(),
        folder: "/tv".to_string(),
        feed_id: feed_id.map(str::to_string),
    }
}

fn item(name: &str, url: &str, feed_id: &str) -> FeedItem {
    FeedItem {
        name: name.to_string(),
        url: url.to_string(),
        category: None,
        guid: None,
        feed_id: feed_id.to_string(),
    }
}

async fn mount_payload(server: &MockServer, route: &str) {
    Mock::given(method("GET"))
        .and(url_path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(PAYLOAD))
        .mount(server)
        .await;
}

async fn mount_rpc(server: &MockServer, result: &str) {
    Mock::given(method("POST"))
        .and(url_path("/transmission/rpc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "result": result })),
        )
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// Happy path and persistence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn matched_entry_is_delivered_and_recorded() {
    let state_dir = TempDir::new().unwrap();
    let source = MockServer::start().await;
    let rpc = MockServer::start().await;
    mount_payload(&source, "/dl/show.s01e01.torrent").await;
    mount_rpc(&rpc, "success").await;

    let mut agent = agent_for(&state_dir, &rpc, vec![tv_rule(Some("ABC"))]);
    let url = format!("{}/dl/show.s01e01.torrent", source.uri());
    // Feed scoping is case-insensitive: the rule says "ABC", the item "abc".
    let items = vec![item("Show.S01E01.1080p", &url, "abc")];

    let dispositions = agent
        .process_items(&items, &CancellationToken::new())
        .await;
    assert_eq!(
        dispositions,
        vec![ItemDisposition::Delivered {
            path: "/tv/show.s01e01.torrent".to_string()
        }]
    );
    assert!(agent.state().contains(&url));

    // The checkpoint must already be on disk — a fresh load sees the URL.
    let reloaded = DedupStore::load(state_dir.path().join("state.txt")).unwrap();
    assert!(
        reloaded.contains(&url),
        "delivered entry must be persisted immediately"
    );
}

#[tokio::test]
async fn recorded_entry_is_not_reprocessed() {
    let state_dir = TempDir::new().unwrap();
    let source = MockServer::start().await;
    let rpc = MockServer::start().await;
    mount_payload(&source, "/dl/show.s01e01.torrent").await;
    mount_rpc(&rpc, "success").await;

    let url = format!("{}/dl/show.s01e01.torrent", source.uri());
    let items = vec![item("Show.S01E01.1080p", &url, "abc")];

    let mut agent = agent_for(&state_dir, &rpc, vec![tv_rule(None)]);
    let first = agent.process_items(&items, &CancellationToken::new()).await;
    assert!(matches!(first[0], ItemDisposition::Delivered { .. }));

    // Same agent, same entry: nothing to do.
    let second = agent.process_items(&items, &CancellationToken::new()).await;
    assert_eq!(second, vec![ItemDisposition::AlreadySeen]);

    // A fresh agent (simulated restart) loads the state and agrees.
    let mut restarted = agent_for(&state_dir, &rpc, vec![tv_rule(None)]);
    let third = restarted
        .process_items(&items, &CancellationToken::new())
        .await;
    assert_eq!(third, vec![ItemDisposition::AlreadySeen]);
}

#[tokio::test]
async fn duplicate_at_remote_is_recorded_like_a_success() {
    let state_dir = TempDir::new().unwrap();
    let source = MockServer::start().await;
    let rpc = MockServer::start().await;
    mount_payload(&source, "/dl/show.s02e03.torrent").await;
    mount_rpc(&rpc, "duplicate torrent").await;

    let mut agent = agent_for(&state_dir, &rpc, vec![tv_rule(None)]);
    let url = format!("{}/dl/show.s02e03.torrent", source.uri());
    let dispositions = agent
        .process_items(&[item("Show.S02E03", &url, "abc")], &CancellationToken::new())
        .await;

    assert_eq!(
        dispositions,
        vec![ItemDisposition::Duplicate {
            path: "/tv/show.s02e03.torrent".to_string()
        }]
    );
    assert!(
        agent.state().contains(&url),
        "a remote duplicate must not be retried on the next run"
    );
}

// ---------------------------------------------------------------------------
// Matching outcomes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unmatched_entry_is_ignored_and_unrecorded() {
    let state_dir = TempDir::new().unwrap();
    let rpc = MockServer::start().await;

    let mut agent = agent_for(&state_dir, &rpc, vec![tv_rule(None)]);
    let dispositions = agent
        .process_items(
            &[item("Podcast.Episode.42", "http://example.com/42", "abc")],
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(dispositions, vec![ItemDisposition::NoMatch]);
    assert!(agent.state().is_empty());
}

#[tokio::test]
async fn feed_scoped_rule_ignores_entries_from_other_feeds() {
    let state_dir = TempDir::new().unwrap();
    let rpc = MockServer::start().await;

    let mut agent = agent_for(&state_dir, &rpc, vec![tv_rule(Some("tvfeed"))]);
    let dispositions = agent
        .process_items(
            &[item("Show.S01E01", "http://example.com/1", "moviefeed")],
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(dispositions, vec![ItemDisposition::NoMatch]);
}

#[tokio::test]
async fn empty_folder_match_is_flagged_and_nothing_is_sent() {
    let state_dir = TempDir::new().unwrap();
    let rpc = MockServer::start().await;

    // An empty folder template makes every match resolve to an empty folder.
    let rule = FilterRuleConfig {
        pattern: r"(?i)s\d{2}e\d{2}".to_string(),
        folder: String::new(),
        feed_id: None,
    };
    let mut agent = agent_for(&state_dir, &rpc, vec![rule]);
    let dispositions = agent
        .process_items(
            &[item("Show.S01E01", "http://example.com/1", "abc")],
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(dispositions, vec![ItemDisposition::EmptyFolder]);
    assert!(
        agent.state().is_empty(),
        "a config-error entry must stay retryable after the rule is fixed"
    );
    assert_eq!(
        rpc.received_requests().await.unwrap().len(),
        0,
        "no upload may happen without a destination folder"
    );
}

#[tokio::test]
async fn capture_groups_route_into_per_show_folders() {
    let state_dir = TempDir::new().unwrap();
    let source = MockServer::start().await;
    let rpc = MockServer::start().await;
    mount_payload(&source, "/dl/archive.s03e07.torrent").await;
    mount_rpc(&rpc, "success").await;

    let rule = FilterRuleConfig {
        pattern: r"^(\w+)\.S(\d{2})E\d{2}".to_string(),
        folder: "/tv/$1".to_string(),
        feed_id: None,
    };
    let mut agent = agent_for(&state_dir, &rpc, vec![rule]);
    let url = format!("{}/dl/archive.s03e07.torrent", source.uri());
    let dispositions = agent
        .process_items(&[item("Archive.S03E07.1080p", &url, "abc")], &CancellationToken::new())
        .await;

    assert_eq!(
        dispositions,
        vec![ItemDisposition::Delivered {
            path: "/tv/Archive/archive.s03e07.torrent".to_string()
        }]
    );
}

// ---------------------------------------------------------------------------
// Failure handling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rejected_upload_leaves_the_entry_unrecorded() {
    let state_dir = TempDir::new().unwrap();
    let source = MockServer::start().await;
    let rpc = MockServer::start().await;
    mount_payload(&source, "/dl/show.s01e01.torrent").await;
    mount_rpc(&rpc, "bad torrent").await;

    let mut agent = agent_for(&state_dir, &rpc, vec![tv_rule(None)]);
    let url = format!("{}/dl/show.s01e01.torrent", source.uri());
    let dispositions = agent
        .process_items(&[item("Show.S01E01", &url, "abc")], &CancellationToken::new())
        .await;

    assert_eq!(
        dispositions,
        vec![ItemDisposition::Rejected {
            reason: "bad torrent".to_string()
        }]
    );
    assert!(
        agent.state().is_empty(),
        "a rejected entry must be retried on the next run"
    );
}

#[tokio::test]
async fn failed_payload_fetch_is_errored_and_unrecorded() {
    let state_dir = TempDir::new().unwrap();
    let source = MockServer::start().await;
    let rpc = MockServer::start().await;
    // No payload mock mounted: the fetch returns 404.

    let mut agent = agent_for(&state_dir, &rpc, vec![tv_rule(None)]);
    let url = format!("{}/dl/show.s01e01.torrent", source.uri());
    let dispositions = agent
        .process_items(&[item("Show.S01E01", &url, "abc")], &CancellationToken::new())
        .await;

    assert!(
        matches!(&dispositions[0], ItemDisposition::Errored { .. }),
        "expected Errored, got: {:?}",
        dispositions[0]
    );
    assert!(agent.state().is_empty());
}

#[tokio::test]
async fn unreachable_daemon_is_errored_and_unrecorded() {
    let state_dir = TempDir::new().unwrap();
    let source = MockServer::start().await;
    mount_payload(&source, "/dl/show.s01e01.torrent").await;

    // Point the agent at a port nobody listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let state_file = state_dir.path().join("state.txt");
    DedupStore::create(&state_file).unwrap();
    let config = Config {
        transmission: TransmissionConfig {
            host: "127.0.0.1".to_string(),
            port: addr.port(),
            auth: None,
        },
        state_file,
        filters: vec![tv_rule(None)],
        http_timeout: Duration::from_secs(2),
    };
    let mut agent = FeedAgent::new(&config).unwrap();

    let url = format!("{}/dl/show.s01e01.torrent", source.uri());
    let dispositions = agent
        .process_items(&[item("Show.S01E01", &url, "abc")], &CancellationToken::new())
        .await;

    assert!(matches!(&dispositions[0], ItemDisposition::Errored { .. }));
    assert!(agent.state().is_empty());
}

#[tokio::test]
async fn one_failure_does_not_abort_the_batch() {
    let state_dir = TempDir::new().unwrap();
    let source = MockServer::start().await;
    let rpc = MockServer::start().await;
    // Only the second item's payload exists; the first fetch returns 404.
    mount_payload(&source, "/dl/good.s01e02.torrent").await;
    mount_rpc(&rpc, "success").await;

    let mut agent = agent_for(&state_dir, &rpc, vec![tv_rule(None)]);
    let bad_url = format!("{}/dl/missing.s01e01.torrent", source.uri());
    let good_url = format!("{}/dl/good.s01e02.torrent", source.uri());
    let items = vec![
        item("Missing.S01E01", &bad_url, "abc"),
        item("Good.S01E02", &good_url, "abc"),
    ];

    let dispositions = agent
        .process_items(&items, &CancellationToken::new())
        .await;
    assert!(matches!(&dispositions[0], ItemDisposition::Errored { .. }));
    assert_eq!(
        dispositions[1],
        ItemDisposition::Delivered {
            path: "/tv/good.s01e02.torrent".to_string()
        }
    );
    assert!(!agent.state().contains(&bad_url));
    assert!(agent.state().contains(&good_url));
}

#[tokio::test]
async fn cancelled_batch_short_circuits_without_recording() {
    let state_dir = TempDir::new().unwrap();
    let rpc = MockServer::start().await;

    let mut agent = agent_for(&state_dir, &rpc, vec![tv_rule(None)]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let items = vec![
        item("Show.S01E01", "http://example.com/1", "abc"),
        item("Show.S01E02", "http://example.com/2", "abc"),
    ];
    let dispositions = agent.process_items(&items, &cancel).await;

    assert_eq!(dispositions.len(), 2);
    for disposition in &dispositions {
        assert!(
            matches!(disposition, ItemDisposition::Errored { .. }),
            "cancelled entries must be reported as errored, got: {disposition:?}"
        );
    }
    assert!(agent.state().is_empty());
}

#[tokio::test]
async fn missing_state_file_fails_construction() {
    let state_dir = TempDir::new().unwrap();
    let config = Config {
        state_file: state_dir.path().join("never-created.state"),
        ..Config::default()
    };
    let err = match FeedAgent::new(&config) {
        Err(e) => e,
        Ok(_) => panic!("expected construction to fail on a missing state file"),
    };
    assert!(matches!(err, Error::Io(_)), "expected Io error, got: {err:?}");
}

// ---------------------------------------------------------------------------
// Wire details
// ---------------------------------------------------------------------------

#[tokio::test]
async fn content_disposition_filename_names_the_save_path() {
    let state_dir = TempDir::new().unwrap();
    let source = MockServer::start().await;
    let rpc = MockServer::start().await;
    Mock::given(method("GET"))
        .and(url_path("/dl/1234"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "Content-Disposition",
                    "attachment; filename=\"Weekly.Show.S05E11.torrent\"",
                )
                .set_body_bytes(PAYLOAD),
        )
        .mount(&source)
        .await;
    mount_rpc(&rpc, "success").await;

    let mut agent = agent_for(&state_dir, &rpc, vec![tv_rule(None)]);
    let url = format!("{}/dl/1234", source.uri());
    let dispositions = agent
        .process_items(&[item("Weekly.Show.S05E11", &url, "abc")], &CancellationToken::new())
        .await;

    assert_eq!(
        dispositions,
        vec![ItemDisposition::Delivered {
            path: "/tv/Weekly.Show.S05E11.torrent".to_string()
        }]
    );
}

#[tokio::test]
async fn matched_folder_is_forwarded_as_the_download_dir() {
    let state_dir = TempDir::new().unwrap();
    let source = MockServer::start().await;
    let rpc = MockServer::start().await;
    mount_payload(&source, "/dl/show.s01e01.torrent").await;
    Mock::given(method("POST"))
        .and(url_path("/transmission/rpc"))
        .and(body_partial_json(serde_json::json!({
            "method": "torrent-add",
            "arguments": { "download-dir": "/tv" },
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "result": "success" })),
        )
        .expect(1)
        .mount(&rpc)
        .await;

    let mut agent = agent_for(&state_dir, &rpc, vec![tv_rule(None)]);
    let url = format!("{}/dl/show.s01e01.torrent", source.uri());
    let dispositions = agent
        .process_items(&[item("Show.S01E01", &url, "abc")], &CancellationToken::new())
        .await;

    assert!(matches!(&dispositions[0], ItemDisposition::Delivered { .. }));
}
