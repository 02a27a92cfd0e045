use chrono::{DateTime, TimeDelta, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeSet;
use std::time::Duration;

use super::random::{jitter, quantize_duration, scale_duration, UniformSource};

/// Parameters for one job's failure backoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffSettings {
    /// Failures inside the reset window that never provoke a pause.
    pub max_consecutive_failures: u32,
    /// Base pause, multiplied by `pause_escalation` per charged failure.
    pub pause_period: Duration,
    /// Multiplicative growth per failure beyond the free allowance.
    pub pause_escalation: f64,
    /// Upper bound on any returned pause.
    pub max_pause_duration: Duration,
    /// Failures older than this (relative to the observed execution) are forgotten.
    pub pause_reset_period: Duration,
    /// Relative jitter in `[0, 1]`; 0 disables randomization.
    pub jitter_factor: f64,
    /// Pauses are rounded up to a multiple of this value.
    pub quantum: Duration,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 5,
            pause_period: Duration::from_secs(30),
            pause_escalation: 1.2,
            max_pause_duration: Duration::from_secs(15 * 60),
            pause_reset_period: Duration::from_secs(60 * 60),
            jitter_factor: 0.1,
            quantum: Duration::from_secs(15),
        }
    }
}

impl BackoffSettings {
    pub fn validate(&self) -> Result<(), BackoffError> {
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(BackoffError::JitterOutOfRange(self.jitter_factor));
        }
        if !self.pause_escalation.is_finite() || self.pause_escalation <= 0.0 {
            return Err(BackoffError::InvalidEscalation(self.pause_escalation));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackoffError {
    #[error("jitter factor {0} must be within [0, 1]")]
    JitterOutOfRange(f64),
    #[error("pause escalation {0} must be a positive finite number")]
    InvalidEscalation(f64),
}

/// Per-job failure history and pause calculator.
#[derive(Debug)]
pub struct Backoff<R = StdRng> {
    settings: BackoffSettings,
    failure_times: BTreeSet<DateTime<Utc>>,
    random: R,
}

impl Backoff<StdRng> {
    pub fn new(settings: BackoffSettings) -> Result<Self, BackoffError> {
        Self::with_source(settings, StdRng::from_entropy())
    }
}

impl<R: UniformSource> Backoff<R> {
    /// Build a backoff drawing jitter from `random` (tests pass a fixed source).
    pub fn with_source(settings: BackoffSettings, random: R) -> Result<Self, BackoffError> {
        settings.validate()?;
        Ok(Self {
            settings,
            failure_times: BTreeSet::new(),
            random,
        })
    }

    pub fn settings(&self) -> &BackoffSettings {
        &self.settings
    }

    /// Number of failures currently inside the reset window.
    pub fn failure_count(&self) -> usize {
        self.failure_times.len()
    }

    /// Record one execution and return the pause it warrants, if any.
    ///
    /// Successful executions never pause but still evict stale failures.
    pub fn observe_execution(
        &mut self,
        execution_time: DateTime<Utc>,
        is_error: bool,
    ) -> Option<Duration> {
        if is_error {
            self.failure_times.insert(execution_time);
        }

        let reset = TimeDelta::from_std(self.settings.pause_reset_period).unwrap_or(TimeDelta::MAX);
        self.failure_times
            .retain(|t| execution_time.signed_duration_since(*t) <= reset);

        let charged = self.failure_times.len() as i64
            - i64::from(self.settings.max_consecutive_failures);
        if !is_error || charged <= 0 {
            return None;
        }

        let exponent = i32::try_from(charged).unwrap_or(i32::MAX);
        let raw = scale_duration(
            self.settings.pause_period,
            self.settings.pause_escalation.powi(exponent),
        );
        let jittered = jitter(raw, self.settings.jitter_factor, &mut self.random);
        let pause =
            quantize_duration(jittered, self.settings.quantum).min(self.settings.max_pause_duration);

        tracing::debug!(
            failures = self.failure_times.len(),
            charged,
            pause_secs = pause.as_secs_f64(),
            "backoff pause computed"
        );

        Some(pause)
    }
}
