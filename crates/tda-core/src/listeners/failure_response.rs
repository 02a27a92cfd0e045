use std::sync::Mutex;

use crate::backoff::{Backoff, BackoffError, BackoffSettings, UniformSource};
use crate::scheduler::{JobExecution, JobListener, SchedulerHandle};

/// Pauses a job after too many recent failures and schedules its resumption.
///
/// One listener per job; it owns that job's failure history.
pub struct FailureResponseListener<R = rand::rngs::StdRng> {
    backoff: Mutex<Backoff<R>>,
}

impl FailureResponseListener {
    pub fn new(settings: BackoffSettings) -> Result<Self, BackoffError> {
        Ok(Self {
            backoff: Mutex::new(Backoff::new(settings)?),
        })
    }
}

impl<R: UniformSource> FailureResponseListener<R> {
    pub fn with_backoff(backoff: Backoff<R>) -> Self {
        Self {
            backoff: Mutex::new(backoff),
        }
    }
}

impl<R: UniformSource + Send> JobListener for FailureResponseListener<R> {
    fn job_was_executed(&self, execution: &JobExecution<'_>, scheduler: &SchedulerHandle) {
        let mut backoff = match self.backoff.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(pause) = backoff.observe_execution(execution.fire_time, execution.is_error()) else {
            return;
        };
        let max = backoff.settings().max_consecutive_failures;
        drop(backoff);

        let key = execution.key.clone();
        tracing::warn!(
            "Pausing execution of job {} for {:?} due to consecutive failure count exceeding {}",
            key,
            pause,
            max
        );
        scheduler.pause_job(&key);
        scheduler.schedule_once(pause, move |handle| {
            tracing::info!("resuming job {}", key);
            handle.resume_job(&key);
        });
    }
}
