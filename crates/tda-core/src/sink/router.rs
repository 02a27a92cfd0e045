use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::row::{encode_json_each_row, FeedContentsRow, FEED_CONTENTS_COLUMNS};
use super::PrimarySink;
use crate::fallback::{FallbackError, FallbackWriter};
use crate::fetch::FetchResult;
use crate::gtfs_rt::CodecCache;
use crate::metrics;

/// Where a result ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Primary { written_rows: Option<u64> },
    Fallback,
    /// Status not worth persisting (`UNCHANGED`, `NOT_MODIFIED`).
    Skipped,
}

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("failed to serialize fetch result: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("database insert failed and fallback write failed: {0}")]
    Fallback(#[from] FallbackError),
}

/// Sends rows to the primary sink, or to the fallback writer when the sink fails.
pub struct PersistenceRouter {
    sink: Arc<dyn PrimarySink>,
    fallback: Arc<dyn FallbackWriter>,
    codecs: Arc<CodecCache>,
    table: String,
}

impl PersistenceRouter {
    pub fn new(
        sink: Arc<dyn PrimarySink>,
        fallback: Arc<dyn FallbackWriter>,
        codecs: Arc<CodecCache>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            sink,
            fallback,
            codecs,
            table: table.into(),
        }
    }

    pub fn persist(&self, result: &FetchResult) -> Result<PersistOutcome, PersistError> {
        if !result.status.should_persist() {
            return Ok(PersistOutcome::Skipped);
        }

        let codec = self.codecs.get(result.enabled_extensions);
        let row = FeedContentsRow::from_result(result, &codec)?;
        let bytes = encode_json_each_row(&row)?;

        let outcome = self.route(
            &self.table,
            &FEED_CONTENTS_COLUMNS,
            &bytes,
            &[
                ("producer", result.producer.as_str()),
                ("feed", result.feed.as_str()),
            ],
            result.fetch_time,
        )?;
        if outcome == PersistOutcome::Fallback {
            metrics::record_fallback(&result.producer, &result.feed);
        }
        Ok(outcome)
    }

    /// Insert pre-encoded JSONEachRow `rows` into `table`, or hand the same
    /// bytes to the fallback writer under `partition` if the insert fails.
    pub fn route(
        &self,
        table: &str,
        columns: &[&str],
        rows: &[u8],
        partition: &[(&str, &str)],
        fetch_time: DateTime<Utc>,
    ) -> Result<PersistOutcome, PersistError> {
        match self.sink.insert(table, columns, rows) {
            Ok(summary) => {
                tracing::trace!(table, written_rows = ?summary.written_rows, "persisted rows");
                Ok(PersistOutcome::Primary {
                    written_rows: summary.written_rows,
                })
            }
            Err(e) => {
                tracing::warn!(table, error = %e, "database insert failed; writing fallback copy");
                self.fallback.write(partition, fetch_time, rows)?;
                Ok(PersistOutcome::Fallback)
            }
        }
    }
}
