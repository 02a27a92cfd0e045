//! Minimal GTFS-realtime feed server for integration tests.
//!
//! Serves one protobuf body for every path with a fixed `ETag` and
//! `Last-Modified`; answers a matching `If-None-Match` with 304.

use prost::Message;
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use tda_core::gtfs_rt::bindings::{FeedHeader, FeedMessage};

use super::{read_request, write_response, RawRequest};

pub const ETAG: &str = "\"feed-v1\"";
pub const LAST_MODIFIED: &str = "Tue, 14 Nov 2023 22:13:20 GMT";

pub struct FeedServer {
    pub base_url: String,
    pub hits: Arc<AtomicUsize>,
    pub requests: Arc<Mutex<Vec<RawRequest>>>,
}

pub fn feed_body(timestamp: u64) -> Vec<u8> {
    FeedMessage {
        header: Some(FeedHeader {
            gtfs_realtime_version: Some("2.0".to_string()),
            timestamp: Some(timestamp),
            ..Default::default()
        }),
        entity: vec![],
    }
    .encode_to_vec()
}

/// Starts the server in a background thread. It runs until the process exits.
pub fn start(timestamp: u64) -> FeedServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(feed_body(timestamp));
    let hits = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));

    let (h, r) = (Arc::clone(&hits), Arc::clone(&requests));
    thread::spawn(move || {
        for mut stream in listener.incoming().flatten() {
            let Some(request) = read_request(&mut stream) else {
                continue;
            };
            h.fetch_add(1, Ordering::SeqCst);
            let not_modified = request.header("If-None-Match") == Some(ETAG);
            r.lock().unwrap().push(request);

            let validators = [
                ("ETag", ETAG.to_string()),
                ("Last-Modified", LAST_MODIFIED.to_string()),
            ];
            if not_modified {
                write_response(&mut stream, "304 Not Modified", &validators, b"");
            } else {
                write_response(&mut stream, "200 OK", &validators, &body);
            }
        }
    });

    FeedServer {
        base_url: format!("http://127.0.0.1:{}/", port),
        hits,
        requests,
    }
}
