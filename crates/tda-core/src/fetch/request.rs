use chrono::{DateTime, Utc};
use std::time::Duration;
use url::Url;

use super::result::ConditionalGetState;
use crate::config::{ArchiverConfig, BasicAuth, FeedConfig};
use crate::gtfs_rt::ExtensionSet;
use crate::http::{format_http_date, HttpRequest};

/// A feed with every global default resolved; what a fetch cycle needs to run.
#[derive(Debug, Clone)]
pub struct FeedDescriptor {
    pub producer: String,
    pub feed: String,
    /// Feed URL with configured query parameters already appended.
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub basic_auth: Option<BasicAuth>,
    pub ignore_tls_errors: bool,
    pub extensions: ExtensionSet,
    pub parse_partial: bool,
    pub store_response_body: bool,
    pub store_response_body_on_error: bool,
    pub call_timeout: Duration,
}

impl FeedDescriptor {
    pub fn from_config(feed: &FeedConfig, global: &ArchiverConfig) -> Result<Self, url::ParseError> {
        let mut url = Url::parse(&feed.feed_url)?;
        if !feed.query_parameters.is_empty() {
            url.query_pairs_mut().extend_pairs(&feed.query_parameters);
        }

        Ok(Self {
            producer: feed.producer.clone(),
            feed: feed.feed.clone(),
            url,
            headers: feed
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            basic_auth: feed.basic_auth.clone(),
            ignore_tls_errors: feed.ignore_tls_errors,
            extensions: feed.extensions,
            parse_partial: feed.parse_partial,
            store_response_body: feed.store_response_body(global),
            store_response_body_on_error: feed.store_response_body_on_error(global),
            call_timeout: global.call_timeout(),
        })
    }

    /// `producer.feed`, the identity used in logs and job keys.
    pub fn name(&self) -> String {
        format!("{}.{}", self.producer, self.feed)
    }

    /// Whether the raw body of a result with this outcome should be kept.
    pub fn retains_body(&self, is_error: bool) -> bool {
        self.store_response_body || (is_error && self.store_response_body_on_error)
    }
}

/// Build the GET for one cycle, attaching conditional headers from `state`.
///
/// `If-Modified-Since` is only sent when the remembered `Last-Modified` is
/// not in the future. The returned flag is true when at least one
/// conditional header was attached.
pub fn build_request(
    feed: &FeedDescriptor,
    state: &ConditionalGetState,
    fetch_time: DateTime<Utc>,
) -> (HttpRequest, bool) {
    let mut request = HttpRequest::get(feed.url.clone(), feed.call_timeout);
    request.headers = feed.headers.clone();
    request.basic_auth = feed.basic_auth.clone();
    request.ignore_tls_errors = feed.ignore_tls_errors;

    let mut conditional = false;
    if let Some(etag) = &state.etag {
        request
            .headers
            .push(("If-None-Match".to_string(), etag.clone()));
        conditional = true;
    }
    if let Some(last_modified) = state.last_modified {
        if last_modified <= fetch_time {
            request
                .headers
                .push(("If-Modified-Since".to_string(), format_http_date(last_modified)));
            conditional = true;
        }
    }

    (request, conditional)
}
