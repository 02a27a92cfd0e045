//! London Underground Trackernet prediction archiving.
//!
//! Each configured line is one [`LineArchiveJob`] on the shared scheduler,
//! persisting through the same router and fallback as GTFS-realtime feeds.
//! Jobs are keyed `trackernet.<line_code>`.

mod client;
mod job;
mod model;

pub use client::{TrackernetClient, TrackernetError};
pub use job::LineArchiveJob;
pub use model::{
    encode_rows, parse_detail, parse_summary, DetailPlatform, DetailRow, DetailStation,
    DetailTrain, PredictionDetail, PredictionSummary, SummaryPlatform, SummaryRow,
    SummaryStation, SummaryTime, SummaryTrain, DETAILS_COLUMNS, SUMMARY_COLUMNS,
};

use crate::scheduler::JobKey;

/// Scheduler group shared by every Trackernet line job.
pub const TRACKERNET_GROUP: &str = "trackernet";

pub fn job_key(line_code: &str) -> JobKey {
    JobKey::new(TRACKERNET_GROUP, line_code)
}

#[cfg(test)]
mod tests;
