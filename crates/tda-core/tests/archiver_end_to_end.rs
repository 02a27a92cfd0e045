//! Integration tests: real curl fetches against a local feed server, persisted
//! through the ClickHouse HTTP sink or the local fallback.

mod common;

use chrono::{TimeZone, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tda_core::archiver::{Archiver, Components, RunMode};
use tda_core::config::ArchiverConfig;
use tda_core::fallback::{FallbackError, FallbackWriter};
use tda_core::fetch::{ConditionalGetState, FeedDescriptor, FetchExecutor, FetchStatus};
use tda_core::gtfs_rt::CodecCache;
use tda_core::http::CurlHttpClient;
use tda_core::sink::{InsertSummary, PersistenceRouter, PrimarySink, SinkError};
use tempfile::tempdir;

const FEED_TIMESTAMP: u64 = 1_700_000_000;

fn config(db_url: &str, fallback: Option<&Path>, feed_urls: &[(&str, String)]) -> ArchiverConfig {
    let mut toml = format!(
        "call_timeout_secs = 5\n\n[database]\nurl = \"{}\"\npassword = \"secret\"\n",
        db_url
    );
    if let Some(base) = fallback {
        toml.push_str(&format!(
            "\n[fallback]\nenabled = true\nbase_path = \"{}\"\ncompression = \"none\"\n",
            base.display()
        ));
    }
    for (feed, url) in feed_urls {
        toml.push_str(&format!(
            "\n[[feeds]]\nproducer = \"mta\"\nfeed = \"{}\"\nfeed_url = \"{}\"\n",
            feed, url
        ));
    }
    let cfg = ArchiverConfig::from_toml_str(&toml).unwrap();
    cfg.validate().unwrap();
    cfg
}

fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir).unwrap().flatten() {
        let path = entry.path();
        if path.is_dir() {
            out.extend(files_under(&path));
        } else {
            out.push(path);
        }
    }
    out.sort();
    out
}

async fn run_one_shot(cfg: &ArchiverConfig) -> bool {
    let components = Components::from_config(cfg).unwrap();
    let archiver = Archiver::new(cfg, RunMode::OneShot, components).unwrap();
    assert_eq!(
        archiver.job_count(),
        cfg.feeds.len() + cfg.trackernet_lines().len()
    );
    let exit = tokio::time::timeout(Duration::from_secs(30), archiver.run())
        .await
        .expect("one-shot run finished");
    exit.terminated_with_error
}

#[tokio::test(flavor = "multi_thread")]
async fn one_shot_inserts_every_feed_into_clickhouse() {
    let feeds = common::feed_server::start(FEED_TIMESTAMP);
    let db = common::clickhouse_server::start();
    let cfg = config(
        &db.url,
        None,
        &[
            ("ace", format!("{}ace", feeds.base_url)),
            ("bdfm", format!("{}bdfm", feeds.base_url)),
        ],
    );

    assert!(!run_one_shot(&cfg).await);

    let inserts = db.inserts.lock().unwrap();
    assert_eq!(inserts.len(), 2);
    let mut feeds_seen = Vec::new();
    for insert in inserts.iter() {
        assert_eq!(insert.method, "POST");
        assert!(insert.target.contains("INSERT+INTO+feed_contents"));
        assert_eq!(insert.header("X-ClickHouse-Key"), Some("secret"));
        let row: serde_json::Value = serde_json::from_slice(&insert.body).unwrap();
        assert_eq!(row["producer"], "mta");
        assert_eq!(row["is_error"], false);
        assert_eq!(row["status_code"], 200);
        assert_eq!(row["response_contents"]["header"]["timestamp"], FEED_TIMESTAMP);
        feeds_seen.push(row["feed"].as_str().unwrap().to_string());
    }
    feeds_seen.sort();
    assert_eq!(feeds_seen, vec!["ace", "bdfm"]);

    let ua = feeds.requests.lock().unwrap()[0]
        .header("User-Agent")
        .unwrap()
        .to_string();
    assert!(ua.starts_with("tda/"), "unexpected user agent {}", ua);
}

#[tokio::test(flavor = "multi_thread")]
async fn database_outage_falls_back_to_partitioned_files() {
    let feeds = common::feed_server::start(FEED_TIMESTAMP);
    let base = tempdir().unwrap();
    let cfg = config(
        &common::closed_port_url(),
        Some(base.path()),
        &[
            ("ace", format!("{}ace", feeds.base_url)),
            ("bdfm", format!("{}bdfm", feeds.base_url)),
            ("g", format!("{}g", feeds.base_url)),
            ("l", format!("{}l", common::closed_port_url())),
        ],
    );

    assert!(!run_one_shot(&cfg).await);

    let files = files_under(base.path());
    assert_eq!(files.len(), 4, "fallback files: {:?}", files);
    for file in &files {
        assert_eq!(file.extension().and_then(|e| e.to_str()), Some("json"));
        let rel = file.strip_prefix(base.path()).unwrap();
        assert!(rel.starts_with("producer=mta"));
    }

    let unreachable = base.path().join("producer=mta").join("feed=l");
    let error_file = &files_under(&unreachable)[0];
    let row: serde_json::Value =
        serde_json::from_slice(&std::fs::read(error_file).unwrap()).unwrap();
    assert_eq!(row["is_error"], true);
    assert!(row["error_message"].is_string());
    assert!(row["status_code"].is_null());
}

#[tokio::test(flavor = "multi_thread")]
async fn one_shot_archives_trackernet_lines_alongside_feeds() {
    let feeds = common::feed_server::start(FEED_TIMESTAMP);
    let trackernet = common::trackernet_server::start();
    let db = common::clickhouse_server::start();
    let mut toml = format!(
        "call_timeout_secs = 5\n\n[database]\nurl = \"{}\"\npassword = \"secret\"\n",
        db.url
    );
    toml.push_str(&format!(
        "\n[[feeds]]\nproducer = \"mta\"\nfeed = \"ace\"\nfeed_url = \"{}ace\"\n",
        feeds.base_url
    ));
    toml.push_str(&format!(
        "\n[trackernet]\napp_key = \"test-key\"\nbase_url = \"{}\"\n\n[[trackernet.lines]]\nline_code = \"W\"\n",
        trackernet.base_url
    ));
    let cfg = ArchiverConfig::from_toml_str(&toml).unwrap();
    cfg.validate().unwrap();

    assert!(!run_one_shot(&cfg).await);

    let targets: Vec<String> = trackernet
        .requests
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.target.clone())
        .collect();
    assert_eq!(
        targets,
        vec![
            "/TrackerNet/PredictionSummary/W?app_key=test-key",
            "/TrackerNet/PredictionDetailed/W/BNK?app_key=test-key",
        ]
    );

    let inserts = db.inserts.lock().unwrap();
    assert_eq!(inserts.len(), 3);
    let into = |table: &str| {
        inserts
            .iter()
            .filter(|i| i.target.contains(&format!("INSERT+INTO+{}", table)))
            .count()
    };
    assert_eq!(into("feed_contents"), 1);
    assert_eq!(into("prediction_summary"), 1);
    assert_eq!(into("prediction_details"), 1);
}

/// Fails while `remaining_failures` is non-zero, then accepts.
struct FlakySink {
    remaining_failures: Mutex<usize>,
    rows: Mutex<Vec<Vec<u8>>>,
}

impl PrimarySink for FlakySink {
    fn insert(&self, _table: &str, _columns: &[&str], rows: &[u8]) -> Result<InsertSummary, SinkError> {
        let mut remaining = self.remaining_failures.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(SinkError::Transport("connection reset".to_string()));
        }
        self.rows.lock().unwrap().push(rows.to_vec());
        Ok(InsertSummary::default())
    }
}

#[derive(Default)]
struct RecordingFallback {
    fail: AtomicBool,
    writes: Mutex<Vec<Vec<u8>>>,
}

impl FallbackWriter for RecordingFallback {
    fn write(
        &self,
        _partition_keys: &[(&str, &str)],
        _fetch_time: chrono::DateTime<Utc>,
        data: &[u8],
    ) -> Result<(), FallbackError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(FallbackError::MissingBasePath);
        }
        self.writes.lock().unwrap().push(data.to_vec());
        Ok(())
    }
}

#[test]
fn every_persistable_result_lands_somewhere_and_validators_are_reused() {
    let feeds = common::feed_server::start(FEED_TIMESTAMP);
    let cfg = config(
        "http://127.0.0.1:1/",
        None,
        &[("ace", format!("{}ace", feeds.base_url))],
    );
    let feed = FeedDescriptor::from_config(&cfg.feeds[0], &cfg).unwrap();

    let sink = Arc::new(FlakySink {
        remaining_failures: Mutex::new(1),
        rows: Mutex::new(Vec::new()),
    });
    let fallback = Arc::new(RecordingFallback::default());
    let codecs = Arc::new(CodecCache::default());
    let router = Arc::new(PersistenceRouter::new(
        sink.clone(),
        fallback.clone(),
        codecs.clone(),
        "feed_contents",
    ));
    let executor = FetchExecutor::new(Arc::new(CurlHttpClient::new("tda-test")), codecs, router);

    let mut state = ConditionalGetState::default();
    let t0 = Utc.timestamp_opt(1_700_000_100, 0).unwrap();

    // Sink down: the row goes to the fallback instead.
    let first = executor.run_cycle(&feed, &mut state, t0).unwrap();
    assert_eq!(first.status, FetchStatus::Success);
    assert_eq!(fallback.writes.lock().unwrap().len(), 1);
    assert_eq!(state.etag.as_deref(), Some(common::feed_server::ETAG));

    // Validators are sent back; 304 is not persisted anywhere.
    let second = executor
        .run_cycle(&feed, &mut state, t0 + chrono::TimeDelta::seconds(30))
        .unwrap();
    assert_eq!(second.status, FetchStatus::NotModified);
    let last = feeds.requests.lock().unwrap().last().cloned().unwrap();
    assert_eq!(last.header("If-None-Match"), Some(common::feed_server::ETAG));
    assert_eq!(
        last.header("If-Modified-Since"),
        Some(common::feed_server::LAST_MODIFIED)
    );
    assert_eq!(sink.rows.lock().unwrap().len(), 0);
    assert_eq!(fallback.writes.lock().unwrap().len(), 1);

    // Both destinations failing surfaces an error and leaves state untouched.
    let before = state.clone();
    let mut fresh_feed = feed.clone();
    fresh_feed.feed = "ace-copy".to_string();
    let mut fresh_state = ConditionalGetState::default();
    *sink.remaining_failures.lock().unwrap() = 1;
    fallback.fail.store(true, Ordering::SeqCst);
    assert!(executor
        .run_cycle(&fresh_feed, &mut fresh_state, t0 + chrono::TimeDelta::seconds(60))
        .is_err());
    assert_eq!(fresh_state, ConditionalGetState::default());
    assert_eq!(state, before);
}
