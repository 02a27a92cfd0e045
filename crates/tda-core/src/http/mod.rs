//! Blocking HTTP client seam for feed fetches.
//!
//! [`CurlHttpClient`] is the libcurl-backed implementation. Callers running
//! in async code should wrap [`HttpClient::execute`] in `spawn_blocking`.

mod curl_client;
mod date;
mod parse;

use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

use crate::config::BasicAuth;

pub use curl_client::CurlHttpClient;
pub use date::{format_http_date, parse_http_date};
pub(crate) use parse::parse_response_head;

/// Response header multimap: lowercase names to values in arrival order.
pub type ResponseHeaders = BTreeMap<String, Vec<String>>;

/// One outgoing request with its per-call customizations.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub basic_auth: Option<BasicAuth>,
    /// Skip certificate and hostname verification for this call only.
    pub ignore_tls_errors: bool,
    /// Overall call timeout.
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn get(url: Url, timeout: Duration) -> Self {
        Self {
            url,
            headers: Vec::new(),
            basic_auth: None,
            ignore_tls_errors: false,
            timeout,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status_code: u16,
    pub status_message: String,
    /// Negotiated protocol, e.g. `http/1.1` or `h2`.
    pub protocol: String,
    pub headers: ResponseHeaders,
    pub body: Vec<u8>,
    /// Time from sending the request to the first response byte.
    pub response_time: Duration,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// First value of header `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|v| v.first())
            .map(String::as_str)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// Network-level failure: DNS, connect, TLS, timeout, reset.
    #[error("{0}")]
    Transport(String),
    /// The request could not be constructed; not a property of the remote side.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub trait HttpClient: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError>;
}
