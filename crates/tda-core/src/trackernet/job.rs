use anyhow::{Context, Result};
use chrono::{DateTime, SubsecRound, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use super::client::TrackernetClient;
use super::model::{
    encode_rows, DetailRow, PredictionDetail, SummaryRow, DETAILS_COLUMNS, SUMMARY_COLUMNS,
};
use super::TRACKERNET_GROUP;
use crate::config::{LineConfig, TrackernetConfig};
use crate::metrics;
use crate::scheduler::{Job, JobContext, JobError};
use crate::sink::{PersistOutcome, PersistenceRouter};

/// Archives one line: the line's prediction summary, then details for every
/// station with a train approaching.
pub struct LineArchiveJob {
    line_code: String,
    excluded_stations: HashSet<String>,
    summary_table: String,
    details_table: String,
    client: Arc<TrackernetClient>,
    router: Arc<PersistenceRouter>,
}

impl LineArchiveJob {
    pub fn new(
        line: &LineConfig,
        config: &TrackernetConfig,
        client: Arc<TrackernetClient>,
        router: Arc<PersistenceRouter>,
    ) -> Self {
        Self {
            line_code: line.line_code.clone(),
            excluded_stations: line.excluded_stations.iter().cloned().collect(),
            summary_table: config.summary_table.clone(),
            details_table: config.details_table.clone(),
            client,
            router,
        }
    }

    pub fn line_code(&self) -> &str {
        &self.line_code
    }

    fn archive(&self, fetch_time: DateTime<Utc>) -> Result<()> {
        let line = self.line_code.as_str();
        tracing::trace!("beginning fetch for {}", line);
        let started = Instant::now();

        let summary = self
            .client
            .prediction_summary(line)
            .with_context(|| format!("failed to fetch summary for line {}", line))?;

        let details: Vec<(&str, PredictionDetail)> = summary
            .stations
            .iter()
            .filter(|s| s.has_trains() && !self.excluded_stations.contains(&s.code))
            .filter_map(|s| self.fetch_detail(&s.code).map(|d| (s.code.as_str(), d)))
            .collect();

        tracing::trace!("fetch complete for {}; took {:?}", line, started.elapsed());

        let summary_bytes = encode_rows(&[SummaryRow {
            fetch_time,
            line_code: line,
            prediction_summary_json: &summary,
        }])?;
        self.persist(
            &self.summary_table,
            &SUMMARY_COLUMNS,
            &summary_bytes,
            "summary",
            fetch_time,
        )?;

        if details.is_empty() {
            return Ok(());
        }
        let rows: Vec<DetailRow<'_>> = details
            .iter()
            .map(|(station_code, detail)| DetailRow {
                fetch_time,
                line_code: line,
                station_code: *station_code,
                prediction_details_json: detail,
            })
            .collect();
        let details_bytes = encode_rows(&rows)?;
        self.persist(
            &self.details_table,
            &DETAILS_COLUMNS,
            &details_bytes,
            "details",
            fetch_time,
        )
    }

    /// Details for one station, or `None` if the call failed or answered for
    /// some other line or station.
    fn fetch_detail(&self, station_code: &str) -> Option<PredictionDetail> {
        let line = self.line_code.as_str();
        match self.client.prediction_detail(line, station_code) {
            Ok(detail) if detail.line == line && detail.station.station_code == station_code => {
                Some(detail)
            }
            Ok(detail) => {
                tracing::error!(
                    "PredictionDetailed returned line and station ({}, {}) when ({}, {}) was requested",
                    detail.line,
                    detail.station.station_code,
                    line,
                    station_code
                );
                None
            }
            Err(e) => {
                tracing::error!(
                    "error while fetching details for station {} on line {}: {}",
                    station_code,
                    line,
                    e
                );
                None
            }
        }
    }

    fn persist(
        &self,
        table: &str,
        columns: &[&str],
        rows: &[u8],
        observation_type: &str,
        fetch_time: DateTime<Utc>,
    ) -> Result<()> {
        let partition = [
            ("observation_type", observation_type),
            ("line_code", self.line_code.as_str()),
        ];
        let outcome = self.router.route(table, columns, rows, &partition, fetch_time)?;
        if outcome == PersistOutcome::Fallback {
            metrics::record_fallback(TRACKERNET_GROUP, &self.line_code);
        }
        Ok(())
    }
}

impl Job for LineArchiveJob {
    fn execute(&self, ctx: &mut JobContext<'_>) -> Result<(), JobError> {
        let span = tracing::info_span!("trackernet", line = %self.line_code);
        let _enter = span.enter();

        match self.archive(ctx.fire_time.trunc_subsecs(0)) {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::error!("uncaught error during archive of line {}: {:#}", self.line_code, e);
                metrics::record_uncaught_error(TRACKERNET_GROUP, &self.line_code);
                Err(JobError::Failed(e))
            }
        }
    }
}
