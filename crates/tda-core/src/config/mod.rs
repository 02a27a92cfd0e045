//! Archiver configuration loaded from a TOML file.
//!
//! Durations are whole seconds in `*_secs` fields. Per-feed settings left
//! unset fall back to the top-level values. [`load`] parses and validates in
//! one step; every validation problem is reported, not just the first.

mod feed;
mod trackernet;
mod validate;

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backoff::BackoffSettings;
use crate::fallback::CompressionMode;

pub use feed::{BasicAuth, FeedConfig};
pub use trackernet::{LineConfig, TrackernetConfig};

/// Shortest allowed polling interval.
pub const MIN_FETCH_INTERVAL_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration:\n  {}", .0.join("\n  "))]
    Invalid(Vec<String>),
}

/// A string that never appears in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

/// ClickHouse HTTP interface settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub url: String,
    pub username: String,
    pub password: Secret,
    /// Destination table for fetch rows.
    pub table: String,
    /// Extra ClickHouse settings passed as query parameters (e.g. `async_insert = "1"`).
    pub options: BTreeMap<String, String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".to_string(),
            username: "default".to_string(),
            password: Secret::default(),
            table: "feed_contents".to_string(),
            options: BTreeMap::new(),
        }
    }
}

/// Where rows go when the database rejects them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FallbackConfig {
    pub enabled: bool,
    pub base_path: Option<PathBuf>,
    pub compression: CompressionMode,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub bind_address: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: SocketAddr::from(([0, 0, 0, 0], 9090)),
        }
    }
}

/// Backoff parameters applied after repeated fetch failures.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FailureResponseConfig {
    pub max_consecutive_failures: u32,
    pub pause_period_secs: u64,
    pub pause_escalation: f64,
    pub max_pause_duration_secs: u64,
    pub pause_reset_period_secs: u64,
    pub jitter_factor: f64,
    pub quantum_secs: u64,
}

impl Default for FailureResponseConfig {
    fn default() -> Self {
        let d = BackoffSettings::default();
        Self {
            max_consecutive_failures: d.max_consecutive_failures,
            pause_period_secs: d.pause_period.as_secs(),
            pause_escalation: d.pause_escalation,
            max_pause_duration_secs: d.max_pause_duration.as_secs(),
            pause_reset_period_secs: d.pause_reset_period.as_secs(),
            jitter_factor: d.jitter_factor,
            quantum_secs: d.quantum.as_secs(),
        }
    }
}

impl From<&FailureResponseConfig> for BackoffSettings {
    fn from(c: &FailureResponseConfig) -> Self {
        BackoffSettings {
            max_consecutive_failures: c.max_consecutive_failures,
            pause_period: Duration::from_secs(c.pause_period_secs),
            pause_escalation: c.pause_escalation,
            max_pause_duration: Duration::from_secs(c.max_pause_duration_secs),
            pause_reset_period: Duration::from_secs(c.pause_reset_period_secs),
            jitter_factor: c.jitter_factor,
            quantum: Duration::from_secs(c.quantum_secs),
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiverConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Default backoff; a feed may replace it with its own `failure_response` table.
    #[serde(default)]
    pub failure_response: FailureResponseConfig,
    #[serde(default = "default_fetch_interval_secs")]
    pub fetch_interval_secs: u64,
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    #[serde(default)]
    pub store_response_body: bool,
    #[serde(default = "default_true")]
    pub store_response_body_on_error: bool,
    /// Appended to the User-Agent so feed operators can reach whoever runs this archiver.
    #[serde(default)]
    pub operator_contact: Option<String>,
    /// Maximum number of fetch cycles executing at once across all feeds.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
    #[serde(default)]
    pub trackernet: Option<TrackernetConfig>,
}

fn default_fetch_interval_secs() -> u64 {
    MIN_FETCH_INTERVAL_SECS
}

fn default_call_timeout_secs() -> u64 {
    15
}

fn default_worker_threads() -> usize {
    10
}

fn default_true() -> bool {
    true
}

impl ArchiverConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Trackernet lines, empty when the section is absent.
    pub fn trackernet_lines(&self) -> &[LineConfig] {
        self.trackernet.as_ref().map_or(&[], |t| t.lines.as_slice())
    }

    /// Checks the semantic rules serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let problems = validate::problems(self);
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }
}

/// Read, parse and validate the configuration file at `path`.
pub fn load(path: &Path) -> Result<ArchiverConfig, ConfigError> {
    let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg = ArchiverConfig::from_toml_str(&data).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    cfg.validate()?;
    tracing::info!(
        path = %path.display(),
        feeds = cfg.feeds.len(),
        lines = cfg.trackernet_lines().len(),
        "loaded configuration"
    );
    Ok(cfg)
}
