use chrono::{DateTime, SubsecRound, Utc};
use std::fmt;

use crate::gtfs_rt::{ExtensionSet, FeedMessage};
use crate::http::ResponseHeaders;

/// Outcome class of one fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchStatus {
    /// Transport failure, unsuccessful HTTP status, or unparseable body.
    Error,
    /// New content was fetched and parsed.
    Success,
    /// Fetched fine, but the embedded header timestamp did not advance.
    Unchanged,
    /// The server answered a conditional request with 304.
    NotModified,
}

impl FetchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FetchStatus::Error => "ERROR",
            FetchStatus::Success => "SUCCESS",
            FetchStatus::Unchanged => "UNCHANGED",
            FetchStatus::NotModified => "NOT_MODIFIED",
        }
    }

    /// Only errors and fresh content are written out; the rest are metrics-only.
    pub fn should_persist(self) -> bool {
        match self {
            FetchStatus::Error | FetchStatus::Success => true,
            FetchStatus::Unchanged | FetchStatus::NotModified => false,
        }
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything learned from one poll of one feed.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub producer: String,
    pub feed: String,
    /// Fire time of the cycle, truncated to whole seconds.
    pub fetch_time: DateTime<Utc>,
    pub status: FetchStatus,
    pub error_message: Option<String>,
    pub status_code: Option<u16>,
    pub status_message: Option<String>,
    pub protocol: Option<String>,
    pub response_headers: Option<ResponseHeaders>,
    pub response_time_millis: Option<u64>,
    /// Raw bytes, kept only when the feed's retention policy asks for them.
    pub response_body: Option<Vec<u8>>,
    pub response_contents: Option<FeedMessage>,
    pub response_body_length: Option<usize>,
    pub etag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub header_timestamp: Option<DateTime<Utc>>,
    pub enabled_extensions: ExtensionSet,
}

impl FetchResult {
    /// A blank result; the status starts as `Success` and is downgraded as the cycle learns more.
    pub fn new(
        producer: impl Into<String>,
        feed: impl Into<String>,
        fetch_time: DateTime<Utc>,
        enabled_extensions: ExtensionSet,
    ) -> Self {
        Self {
            producer: producer.into(),
            feed: feed.into(),
            fetch_time: fetch_time.trunc_subsecs(0),
            status: FetchStatus::Success,
            error_message: None,
            status_code: None,
            status_message: None,
            protocol: None,
            response_headers: None,
            response_time_millis: None,
            response_body: None,
            response_contents: None,
            response_body_length: None,
            etag: None,
            last_modified: None,
            header_timestamp: None,
            enabled_extensions,
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == FetchStatus::Error
    }

    pub(crate) fn mark_error(&mut self, message: impl Into<String>) {
        self.status = FetchStatus::Error;
        self.error_message = Some(message.into());
    }
}

/// Conditional-GET validators carried from one successful cycle to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionalGetState {
    pub etag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub header_timestamp: Option<DateTime<Utc>>,
}

impl ConditionalGetState {
    pub fn from_result(result: &FetchResult) -> Self {
        Self {
            etag: result.etag.clone(),
            last_modified: result.last_modified,
            header_timestamp: result.header_timestamp,
        }
    }
}
