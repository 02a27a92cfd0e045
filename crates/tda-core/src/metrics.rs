//! Metric names and recording helpers.
//!
//! Everything goes through the `metrics` facade; [`install_prometheus_exporter`]
//! wires a Prometheus scrape endpoint when enabled. Without an installed
//! recorder the helpers are no-ops, which is what unit tests rely on.
//!
//! # Metrics
//! - `fetch_event_total` (counter): fetch cycles by producer, feed, fetch_status
//! - `uncaught_exception_total` (counter): job failures by producer, feed
//! - `fallback_archive_count` (counter): rows routed to the fallback writer
//! - `last_fetch_time_seconds` (gauge): epoch seconds of the latest fetch
//! - `overall_fetch_duration_seconds` (histogram): whole cycle duration
//! - `server_response_duration_seconds` (histogram): time to first response byte
//! - `response_size_bytes` (histogram): uncompressed response body size

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;

use crate::fetch::FetchStatus;

const FETCH_EVENT_TOTAL: &str = "fetch_event_total";
const UNCAUGHT_EXCEPTION_TOTAL: &str = "uncaught_exception_total";
const FALLBACK_ARCHIVE_COUNT: &str = "fallback_archive_count";
const LAST_FETCH_TIME: &str = "last_fetch_time_seconds";
const OVERALL_FETCH_DURATION: &str = "overall_fetch_duration_seconds";
const SERVER_RESPONSE_DURATION: &str = "server_response_duration_seconds";
const RESPONSE_SIZE_BYTES: &str = "response_size_bytes";
const CODEC_CACHE_ENTRIES: &str = "codec_cache_entries";
const BUILD_INFO: &str = "tda_info";

const DURATION_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0, 30.0];
const SIZE_BUCKETS: &[f64] = &[
    1_024.0, 8_192.0, 65_536.0, 262_144.0, 1_048_576.0, 4_194_304.0, 16_777_216.0,
];

/// Serve `/metrics` on `addr`. Must be called from within a tokio runtime.
pub fn install_prometheus_exporter(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(Matcher::Suffix("duration_seconds".to_string()), DURATION_BUCKETS)
        .context("duration buckets")?
        .set_buckets_for_metric(Matcher::Full(RESPONSE_SIZE_BYTES.to_string()), SIZE_BUCKETS)
        .context("size buckets")?
        .install()
        .with_context(|| format!("failed to start metrics exporter on {}", addr))?;

    describe();
    tracing::info!(%addr, "prometheus exporter listening");
    Ok(())
}

fn describe() {
    ::metrics::describe_counter!(FETCH_EVENT_TOTAL, "number of fetch events");
    ::metrics::describe_counter!(UNCAUGHT_EXCEPTION_TOTAL, "number of uncaught exceptions");
    ::metrics::describe_counter!(
        FALLBACK_ARCHIVE_COUNT,
        "number of fetches written to fallback destination"
    );
    ::metrics::describe_gauge!(LAST_FETCH_TIME, "last fetch time as epoch timestamp");
    ::metrics::describe_histogram!(OVERALL_FETCH_DURATION, "overall fetch duration in seconds");
    ::metrics::describe_histogram!(
        SERVER_RESPONSE_DURATION,
        "time for remote server to respond in seconds"
    );
    ::metrics::describe_histogram!(RESPONSE_SIZE_BYTES, "uncompressed size of response");
    ::metrics::describe_gauge!(CODEC_CACHE_ENTRIES, "cached feed codecs by extension set");
}

/// Per-cycle observations, labeled by producer, feed and status.
#[derive(Debug, Clone, Copy)]
pub struct FetchObservation<'a> {
    pub producer: &'a str,
    pub feed: &'a str,
    pub status: FetchStatus,
    pub fetch_time_epoch_secs: i64,
    pub total: Duration,
    pub response_time_millis: Option<u64>,
    pub response_body_length: Option<usize>,
}

pub fn record_fetch(obs: &FetchObservation<'_>) {
    let labels = [
        ("producer", obs.producer.to_string()),
        ("feed", obs.feed.to_string()),
        ("fetch_status", obs.status.as_str().to_string()),
    ];

    ::metrics::counter!(FETCH_EVENT_TOTAL, &labels).increment(1);
    ::metrics::gauge!(LAST_FETCH_TIME, &labels).set(obs.fetch_time_epoch_secs as f64);
    ::metrics::histogram!(OVERALL_FETCH_DURATION, &labels).record(obs.total.as_secs_f64());

    if let Some(ms) = obs.response_time_millis {
        ::metrics::histogram!(SERVER_RESPONSE_DURATION, &labels).record(ms as f64 / 1_000.0);
    }
    if let Some(len) = obs.response_body_length {
        ::metrics::histogram!(RESPONSE_SIZE_BYTES, &labels).record(len as f64);
    }
}

pub fn record_uncaught_error(producer: &str, feed: &str) {
    ::metrics::counter!(
        UNCAUGHT_EXCEPTION_TOTAL,
        "producer" => producer.to_string(),
        "feed" => feed.to_string()
    )
    .increment(1);
}

pub fn record_fallback(producer: &str, feed: &str) {
    ::metrics::counter!(
        FALLBACK_ARCHIVE_COUNT,
        "producer" => producer.to_string(),
        "feed" => feed.to_string()
    )
    .increment(1);
}

pub fn record_codec_cache_size(entries: usize) {
    ::metrics::gauge!(CODEC_CACHE_ENTRIES).set(entries as f64);
}

/// Constant `1` gauge carrying the running version as a label.
pub fn record_build_info(version: &str) {
    ::metrics::gauge!(BUILD_INFO, "version" => version.to_string()).set(1.0);
}
