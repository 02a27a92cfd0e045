use base64::Engine;
use serde::Serialize;
use serde_json::Value;

use crate::fetch::FetchResult;
use crate::gtfs_rt::{FeedCodec, FeedParser};
use crate::http::ResponseHeaders;

/// Column list of the `feed_contents` table, in row field order.
pub const FEED_CONTENTS_COLUMNS: [&str; 14] = [
    "producer",
    "feed",
    "fetch_time",
    "is_error",
    "error_message",
    "response_time_millis",
    "status_code",
    "status_message",
    "protocol",
    "response_headers",
    "response_body_b64",
    "response_body_length",
    "response_contents",
    "enabled_extensions",
];

/// One persisted fetch result.
#[derive(Debug, Serialize)]
pub struct FeedContentsRow<'a> {
    pub producer: &'a str,
    pub feed: &'a str,
    /// Epoch seconds.
    pub fetch_time: i64,
    pub is_error: bool,
    pub error_message: Option<&'a str>,
    pub response_time_millis: Option<u64>,
    pub status_code: Option<u16>,
    pub status_message: Option<&'a str>,
    pub protocol: Option<&'a str>,
    pub response_headers: Option<&'a ResponseHeaders>,
    pub response_body_b64: Option<String>,
    pub response_body_length: Option<usize>,
    pub response_contents: Option<Value>,
    pub enabled_extensions: Vec<&'static str>,
}

impl<'a> FeedContentsRow<'a> {
    /// Build a row, rendering parsed contents with `codec`.
    pub fn from_result(result: &'a FetchResult, codec: &FeedCodec) -> serde_json::Result<Self> {
        let response_contents = match &result.response_contents {
            Some(message) => Some(codec.to_json(message)?),
            None => None,
        };

        Ok(Self {
            producer: &result.producer,
            feed: &result.feed,
            fetch_time: result.fetch_time.timestamp(),
            is_error: result.is_error(),
            error_message: result.error_message.as_deref(),
            response_time_millis: result.response_time_millis,
            status_code: result.status_code,
            status_message: result.status_message.as_deref(),
            protocol: result.protocol.as_deref(),
            response_headers: result.response_headers.as_ref(),
            response_body_b64: result
                .response_body
                .as_ref()
                .map(|b| base64::engine::general_purpose::STANDARD.encode(b)),
            response_body_length: result.response_body_length,
            response_contents,
            enabled_extensions: result.enabled_extensions.names(),
        })
    }
}

/// One `JSONEachRow` line, newline-terminated.
pub fn encode_json_each_row(row: &FeedContentsRow<'_>) -> serde_json::Result<Vec<u8>> {
    let mut out = serde_json::to_vec(row)?;
    out.push(b'\n');
    Ok(out)
}
