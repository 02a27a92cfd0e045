use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;

use super::classify::{classify_response, is_unchanged};
use super::request::{build_request, FeedDescriptor};
use super::result::{ConditionalGetState, FetchResult, FetchStatus};
use crate::gtfs_rt::{header_timestamp, CodecCache, FeedParser};
use crate::http::{parse_http_date, HttpClient, HttpError, HttpResponse};
use crate::metrics::{self, FetchObservation};
use crate::scheduler::{Job, JobContext, JobError};
use crate::sink::PersistenceRouter;

/// Runs fetch cycles against shared HTTP, codec and persistence resources.
pub struct FetchExecutor {
    http: Arc<dyn HttpClient>,
    codecs: Arc<CodecCache>,
    router: Arc<PersistenceRouter>,
}

impl FetchExecutor {
    pub fn new(
        http: Arc<dyn HttpClient>,
        codecs: Arc<CodecCache>,
        router: Arc<PersistenceRouter>,
    ) -> Self {
        Self {
            http,
            codecs,
            router,
        }
    }

    /// Fetch, parse and classify one poll of `feed`. Does not persist or touch `state`.
    ///
    /// Transport, HTTP and parse failures come back as an `Error` result; only
    /// a request that cannot be issued at all is returned as `Err`.
    pub fn fetch(
        &self,
        feed: &FeedDescriptor,
        state: &ConditionalGetState,
        fetch_time: DateTime<Utc>,
    ) -> Result<FetchResult, HttpError> {
        let (request, conditional) = build_request(feed, state, fetch_time);
        let mut result = FetchResult::new(&feed.producer, &feed.feed, fetch_time, feed.extensions);

        match self.http.execute(&request) {
            Ok(response) => self.absorb_response(feed, state, &mut result, response, conditional),
            Err(HttpError::Transport(message)) => {
                tracing::warn!(error = %message, "feed request failed");
                result.mark_error(message);
            }
            Err(e @ HttpError::InvalidRequest(_)) => return Err(e),
        }

        Ok(result)
    }

    fn absorb_response(
        &self,
        feed: &FeedDescriptor,
        state: &ConditionalGetState,
        result: &mut FetchResult,
        response: HttpResponse,
        conditional: bool,
    ) {
        result.status = classify_response(conditional, response.status_code);
        match result.status {
            FetchStatus::NotModified => tracing::debug!("server reported feed not modified"),
            FetchStatus::Error => {
                result.error_message = Some(format!(
                    "unsuccessful HTTP response: {} {}",
                    response.status_code, response.status_message
                ));
            }
            _ => {}
        }

        result.etag = response.header("etag").map(str::to_string);
        result.last_modified = response.header("last-modified").and_then(parse_http_date);
        result.status_code = Some(response.status_code);
        result.status_message = Some(response.status_message);
        result.protocol = Some(response.protocol);
        result.response_time_millis =
            Some(u64::try_from(response.response_time.as_millis()).unwrap_or(u64::MAX));
        result.response_body_length = Some(response.body.len());
        result.response_headers = Some(response.headers);

        if result.status == FetchStatus::Success {
            let codec = self.codecs.get(feed.extensions);
            match codec.parse(&response.body, feed.parse_partial) {
                Ok(message) => {
                    let ts = i64::try_from(header_timestamp(&message)).unwrap_or(i64::MAX);
                    result.header_timestamp = DateTime::from_timestamp(ts, 0);
                    if is_unchanged(state.header_timestamp, result.header_timestamp, result.fetch_time) {
                        tracing::debug!(
                            header_timestamp = ?result.header_timestamp,
                            "feed header timestamp has not advanced"
                        );
                        result.status = FetchStatus::Unchanged;
                    }
                    result.response_contents = Some(message);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to parse feed body");
                    result.mark_error(e.to_string());
                }
            }
        }

        if feed.retains_body(result.is_error()) {
            result.response_body = Some(response.body);
        }
    }

    /// One full cycle: fetch, persist when warranted, advance `state` on success, record metrics.
    ///
    /// Persistence happens before `state` moves forward, so a cycle that fails
    /// to persist is retried with the old validators next time.
    pub fn run_cycle(
        &self,
        feed: &FeedDescriptor,
        state: &mut ConditionalGetState,
        fetch_time: DateTime<Utc>,
    ) -> Result<FetchResult> {
        let started = Instant::now();
        tracing::debug!("beginning fetch at {}", fetch_time);

        let result = self
            .fetch(feed, state, fetch_time)
            .context("failed to issue feed request")?;

        if result.status.should_persist() {
            self.router
                .persist(&result)
                .context("failed to persist fetch result")?;
        }

        if result.status == FetchStatus::Success {
            *state = ConditionalGetState::from_result(&result);
        }

        let total = started.elapsed();
        tracing::debug!(status = %result.status, elapsed = ?total, "fetch cycle complete");
        metrics::record_fetch(&FetchObservation {
            producer: &result.producer,
            feed: &result.feed,
            status: result.status,
            fetch_time_epoch_secs: result.fetch_time.timestamp(),
            total,
            response_time_millis: result.response_time_millis,
            response_body_length: result.response_body_length,
        });

        Ok(result)
    }
}

/// Scheduled job archiving one feed per firing.
pub struct FeedArchiveJob {
    feed: FeedDescriptor,
    executor: Arc<FetchExecutor>,
}

impl FeedArchiveJob {
    pub fn new(feed: FeedDescriptor, executor: Arc<FetchExecutor>) -> Self {
        Self { feed, executor }
    }

    pub fn feed(&self) -> &FeedDescriptor {
        &self.feed
    }
}

impl Job for FeedArchiveJob {
    fn execute(&self, ctx: &mut JobContext<'_>) -> Result<(), JobError> {
        let span = tracing::info_span!("fetch", producer = %self.feed.producer, feed = %self.feed.feed);
        let _enter = span.enter();

        match self.executor.run_cycle(&self.feed, ctx.state, ctx.fire_time) {
            Ok(result) => {
                ctx.result = Some(result);
                Ok(())
            }
            Err(e) => {
                tracing::error!("uncaught error during fetch of {}: {:#}", self.feed.name(), e);
                metrics::record_uncaught_error(&self.feed.producer, &self.feed.feed);
                Err(JobError::Failed(e))
            }
        }
    }
}
