use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

use super::handle::SchedulerHandle;
use crate::fetch::{ConditionalGetState, FetchResult};

/// Identity of a scheduled job: the producer is the group, the feed the name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobKey {
    pub group: String,
    pub name: String,
}

impl JobKey {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group, self.name)
    }
}

/// What a job sees on one firing. `state` persists across firings of the same job.
pub struct JobContext<'a> {
    pub key: &'a JobKey,
    pub fire_time: DateTime<Utc>,
    pub state: &'a mut ConditionalGetState,
    /// Set by the job for listeners to inspect.
    pub result: Option<FetchResult>,
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("{0:#}")]
    Failed(anyhow::Error),
    #[error("job panicked")]
    Panicked,
}

/// Blocking unit of scheduled work.
pub trait Job: Send + Sync + 'static {
    fn execute(&self, ctx: &mut JobContext<'_>) -> Result<(), JobError>;
}

/// One completed firing, as handed to listeners.
#[derive(Debug)]
pub struct JobExecution<'a> {
    pub key: &'a JobKey,
    pub fire_time: DateTime<Utc>,
    pub result: Option<&'a FetchResult>,
    pub error: Option<&'a JobError>,
}

impl JobExecution<'_> {
    /// The job raised an error or reported an in-band `ERROR` result.
    pub fn is_error(&self) -> bool {
        self.error.is_some() || self.result.is_some_and(FetchResult::is_error)
    }
}

pub trait JobListener: Send + Sync {
    fn job_was_executed(&self, execution: &JobExecution<'_>, scheduler: &SchedulerHandle);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Fire a single time after `start_delay`.
    Once { start_delay: Duration },
    /// Fire every `interval`, first after `start_delay`. Missed ticks are skipped.
    Recurring {
        start_delay: Duration,
        interval: Duration,
    },
    /// Fire first after `start_delay`, then `delay` after each firing completes.
    FixedDelay { start_delay: Duration, delay: Duration },
}
