//! Scripted doubles for the HTTP, sink and fallback seams.

use chrono::{DateTime, Utc};
use prost::Message;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::fallback::{FallbackError, FallbackWriter};
use crate::gtfs_rt::bindings::{FeedHeader, FeedMessage};
use crate::http::{HttpClient, HttpError, HttpRequest, HttpResponse, ResponseHeaders};
use crate::sink::{InsertSummary, PrimarySink, SinkError};

/// Minimal valid feed with the given header timestamp.
pub fn feed_bytes(timestamp: u64) -> Vec<u8> {
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

pub fn response(status_code: u16, headers: &[(&str, &str)], body: Vec<u8>) -> HttpResponse {
    let mut map = ResponseHeaders::new();
    for (k, v) in headers {
        map.entry(k.to_ascii_lowercase())
            .or_default()
            .push(v.to_string());
    }
    HttpResponse {
        status_code,
        status_message: if status_code == 304 { "Not Modified" } else { "OK" }.to_string(),
        protocol: "http/1.1".to_string(),
        headers: map,
        body,
        response_time: Duration::from_millis(42),
    }
}

/// Replays queued outcomes in order and records every request it sees.
#[derive(Default)]
pub struct ScriptedHttpClient {
    outcomes: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub fn push(&self, outcome: Result<HttpResponse, HttpError>) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    pub fn last_request(&self) -> HttpRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        self.requests.lock().unwrap().push(request.clone());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(HttpError::Transport("no scripted response".to_string())))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub failing: AtomicBool,
    /// `(table, rows)` per accepted insert.
    pub inserts: Mutex<Vec<(String, Vec<u8>)>>,
}

impl RecordingSink {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn row_count(&self) -> usize {
        self.inserts.lock().unwrap().len()
    }

    /// Every JSON row inserted into `table`, across all inserts.
    pub fn rows_in(&self, table: &str) -> Vec<serde_json::Value> {
        let inserts = self.inserts.lock().unwrap();
        let rows = inserts
            .iter()
            .filter(|(t, _)| t == table)
            .flat_map(|(_, rows)| rows.split(|b| *b == b'\n'))
            .filter(|line| !line.is_empty())
            .map(|line| serde_json::from_slice(line).unwrap())
            .collect();
        rows
    }
}

impl PrimarySink for RecordingSink {
    fn insert(&self, table: &str, _columns: &[&str], rows: &[u8]) -> Result<InsertSummary, SinkError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::Transport("connection refused".to_string()));
        }
        self.inserts
            .lock()
            .unwrap()
            .push((table.to_string(), rows.to_vec()));
        Ok(InsertSummary {
            written_rows: Some(1),
        })
    }
}

pub struct FallbackWrite {
    pub partition: Vec<(String, String)>,
    pub fetch_time: DateTime<Utc>,
    pub data: Vec<u8>,
}

#[derive(Default)]
pub struct RecordingFallback {
    pub failing: bool,
    pub writes: Mutex<Vec<FallbackWrite>>,
}

impl RecordingFallback {
    pub fn failing() -> Self {
        Self {
            failing: true,
            writes: Mutex::default(),
        }
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

impl FallbackWriter for RecordingFallback {
    fn write(
        &self,
        partition_keys: &[(&str, &str)],
        fetch_time: DateTime<Utc>,
        data: &[u8],
    ) -> Result<(), FallbackError> {
        if self.failing {
            return Err(FallbackError::MissingBasePath);
        }
        self.writes.lock().unwrap().push(FallbackWrite {
            partition: partition_keys
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            fetch_time,
            data: data.to_vec(),
        });
        Ok(())
    }
}
