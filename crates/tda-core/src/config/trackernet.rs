use serde::Deserialize;
use std::time::Duration;

use super::{Secret, MIN_FETCH_INTERVAL_SECS};

/// London Underground Trackernet prediction archiving.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackernetConfig {
    pub app_key: Secret,
    /// API root; must end in `/` so endpoint paths resolve beneath it.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request budget granted by the API operator.
    #[serde(default = "default_max_requests_per_minute")]
    pub max_requests_per_minute: u32,
    /// Share of `max_requests_per_minute` actually used, in `(0, 1]`.
    #[serde(default = "default_derate_factor")]
    pub derate_factor: f64,
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    #[serde(default = "default_summary_table")]
    pub summary_table: String,
    #[serde(default = "default_details_table")]
    pub details_table: String,
    pub lines: Vec<LineConfig>,
}

/// One Underground line, fetched as a prediction summary plus per-station details.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LineConfig {
    pub line_code: String,
    /// Delay between the end of one fetch and the start of the next.
    #[serde(default = "default_line_fetch_interval_secs")]
    pub fetch_interval_secs: u64,
    /// Station codes never fetched in detail.
    #[serde(default)]
    pub excluded_stations: Vec<String>,
}

fn default_base_url() -> String {
    "https://api.tfl.gov.uk/TrackerNet/".to_string()
}

fn default_max_requests_per_minute() -> u32 {
    500
}

fn default_derate_factor() -> f64 {
    0.8
}

fn default_call_timeout_secs() -> u64 {
    2
}

fn default_summary_table() -> String {
    "prediction_summary".to_string()
}

fn default_details_table() -> String {
    "prediction_details".to_string()
}

fn default_line_fetch_interval_secs() -> u64 {
    MIN_FETCH_INTERVAL_SECS
}

impl TrackernetConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Minimum spacing between requests once derated.
    pub fn request_period(&self) -> Duration {
        let per_minute = f64::from(self.max_requests_per_minute) * self.derate_factor;
        Duration::try_from_secs_f64(60.0 / per_minute).unwrap_or(Duration::MAX)
    }

    pub(super) fn problems(&self, out: &mut Vec<String>) {
        if self.app_key.expose().is_empty() {
            out.push("trackernet.app_key must not be empty".to_string());
        }
        match url::Url::parse(&self.base_url) {
            Ok(u) if !u.path().ends_with('/') => out.push(format!(
                "trackernet.base_url {:?} must end in a trailing slash",
                self.base_url
            )),
            Ok(_) => {}
            Err(e) => out.push(format!(
                "trackernet.base_url {:?} is invalid: {}",
                self.base_url, e
            )),
        }
        if self.max_requests_per_minute == 0 {
            out.push("trackernet.max_requests_per_minute must be greater than zero".to_string());
        }
        if !(self.derate_factor > 0.0 && self.derate_factor <= 1.0) {
            out.push(format!(
                "trackernet.derate_factor must be in (0, 1] (got {})",
                self.derate_factor
            ));
        }
        if self.call_timeout_secs == 0 {
            out.push("trackernet.call_timeout_secs must be greater than zero".to_string());
        }

        let mut seen = std::collections::HashSet::new();
        for line in &self.lines {
            if line.line_code.trim().is_empty() {
                out.push("trackernet line_code must not be empty".to_string());
            } else if !seen.insert(line.line_code.as_str()) {
                out.push(format!(
                    "trackernet line {} is defined more than once",
                    line.line_code
                ));
            }
            if line.fetch_interval_secs < MIN_FETCH_INTERVAL_SECS {
                out.push(format!(
                    "trackernet line {}: fetch_interval_secs must be at least {} (got {})",
                    line.line_code, MIN_FETCH_INTERVAL_SECS, line.fetch_interval_secs
                ));
            }
        }
    }
}

impl LineConfig {
    pub fn fetch_interval(&self) -> Duration {
        Duration::from_secs(self.fetch_interval_secs)
    }
}
