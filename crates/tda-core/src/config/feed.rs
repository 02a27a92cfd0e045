use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

use super::{ArchiverConfig, FailureResponseConfig, Secret};
use crate::backoff::BackoffSettings;
use crate::gtfs_rt::ExtensionSet;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BasicAuth {
    pub username: String,
    pub password: Secret,
}

/// One polled feed, identified by `(producer, feed)`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedConfig {
    pub producer: String,
    pub feed: String,
    pub feed_url: String,
    #[serde(default)]
    pub fetch_interval_secs: Option<u64>,
    #[serde(default)]
    pub store_response_body: Option<bool>,
    #[serde(default)]
    pub store_response_body_on_error: Option<bool>,
    /// Static request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Appended to the feed URL's query string.
    #[serde(default)]
    pub query_parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub basic_auth: Option<BasicAuth>,
    #[serde(default)]
    pub ignore_tls_errors: bool,
    #[serde(default)]
    pub extensions: ExtensionSet,
    /// Accept messages missing required fields.
    #[serde(default)]
    pub parse_partial: bool,
    #[serde(default)]
    pub failure_response: Option<FailureResponseConfig>,
}

impl FeedConfig {
    pub fn fetch_interval(&self, global: &ArchiverConfig) -> Duration {
        Duration::from_secs(self.fetch_interval_secs.unwrap_or(global.fetch_interval_secs))
    }

    pub fn store_response_body(&self, global: &ArchiverConfig) -> bool {
        self.store_response_body.unwrap_or(global.store_response_body)
    }

    pub fn store_response_body_on_error(&self, global: &ArchiverConfig) -> bool {
        self.store_response_body_on_error
            .unwrap_or(global.store_response_body_on_error)
    }

    pub fn backoff_settings(&self, global: &ArchiverConfig) -> BackoffSettings {
        self.failure_response
            .as_ref()
            .unwrap_or(&global.failure_response)
            .into()
    }
}
