use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};

use super::handle::{wait_for_shutdown, SchedulerHandle};
use super::job::{Job, JobContext, JobError, JobExecution, JobKey, JobListener, Trigger};
use crate::fetch::ConditionalGetState;
use crate::metrics;

/// How the scheduler ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerExit {
    pub terminated_with_error: bool,
}

struct ScheduledJob {
    key: JobKey,
    job: Arc<dyn Job>,
    trigger: Trigger,
    listeners: Vec<Arc<dyn JobListener>>,
}

pub struct Scheduler {
    handle: SchedulerHandle,
    workers: Arc<Semaphore>,
    jobs: Vec<ScheduledJob>,
}

impl Scheduler {
    /// At most `worker_threads` job bodies execute at once across all jobs.
    pub fn new(worker_threads: usize) -> Self {
        Self {
            handle: SchedulerHandle::new(),
            workers: Arc::new(Semaphore::new(worker_threads.max(1))),
            jobs: Vec::new(),
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    pub fn schedule(
        &mut self,
        key: JobKey,
        job: Arc<dyn Job>,
        trigger: Trigger,
        listeners: Vec<Arc<dyn JobListener>>,
    ) {
        self.handle.register(&key);
        self.jobs.push(ScheduledJob {
            key,
            job,
            trigger,
            listeners,
        });
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Drive every job until shutdown (or, for one-shot triggers, until each has fired).
    pub async fn run(self) -> SchedulerExit {
        let mut tasks = JoinSet::new();
        for job in self.jobs {
            let handle = self.handle.clone();
            let workers = Arc::clone(&self.workers);
            tasks.spawn(run_job(job, handle, workers));
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("scheduler task failed: {}", e);
                self.handle.mark_errored();
                self.handle.shutdown();
            }
        }

        SchedulerExit {
            terminated_with_error: self.handle.errored(),
        }
    }
}

/// Ten years out; stands in for a deadline that would overflow `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 10);

fn deadline_after(delay: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(delay).unwrap_or_else(|| now + FAR_FUTURE)
}

async fn run_job(job: ScheduledJob, handle: SchedulerHandle, workers: Arc<Semaphore>) {
    let mut shutdown = handle.subscribe_shutdown();
    let mut state = ConditionalGetState::default();

    match job.trigger {
        Trigger::Once { start_delay } => {
            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => return,
                _ = tokio::time::sleep_until(deadline_after(start_delay)) => {}
            }
            fire(&job, state, &handle, &workers).await;
            return;
        }
        Trigger::Recurring {
            start_delay,
            interval,
        } => {
            let mut ticker = tokio::time::interval_at(
                deadline_after(start_delay),
                interval.max(Duration::from_millis(1)),
            );
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = wait_for_shutdown(&mut shutdown) => break,
                    _ = ticker.tick() => {}
                }
                if handle.is_paused(&job.key) {
                    tracing::debug!("job {} is paused; skipping firing", job.key);
                    continue;
                }
                state = fire(&job, state, &handle, &workers).await;
            }
        }
        Trigger::FixedDelay { start_delay, delay } => {
            let mut next = deadline_after(start_delay);
            loop {
                tokio::select! {
                    biased;
                    _ = wait_for_shutdown(&mut shutdown) => break,
                    _ = tokio::time::sleep_until(next) => {}
                }
                if handle.is_paused(&job.key) {
                    tracing::debug!("job {} is paused; skipping firing", job.key);
                } else {
                    state = fire(&job, state, &handle, &workers).await;
                }
                next = deadline_after(delay);
                tracing::debug!("rescheduling job {} in {:?}", job.key, delay);
            }
        }
    }
    tracing::debug!("job {} stopped", job.key);
}

/// Execute one firing on the blocking pool, then notify listeners. Returns the job state to carry forward.
///
/// A panicking body counts as a failed firing of that job only: its previous
/// state is kept and every other job keeps its schedule.
async fn fire(
    job: &ScheduledJob,
    state: ConditionalGetState,
    handle: &SchedulerHandle,
    workers: &Semaphore,
) -> ConditionalGetState {
    let Ok(permit) = workers.acquire().await else {
        return state;
    };
    let fire_time = Utc::now();
    let key = job.key.clone();
    let body = Arc::clone(&job.job);
    let previous = state.clone();

    let joined = tokio::task::spawn_blocking(move || {
        let mut state = state;
        let mut ctx = JobContext {
            key: &key,
            fire_time,
            state: &mut state,
            result: None,
        };
        let outcome = body.execute(&mut ctx);
        let result = ctx.result;
        (state, result, outcome)
    })
    .await;
    drop(permit);

    let (state, result, outcome) = match joined {
        Ok(parts) => parts,
        Err(e) => {
            tracing::error!("uncaught error during execution of job {}: {}", job.key, e);
            metrics::record_uncaught_error(&job.key.group, &job.key.name);
            (previous, None, Err(JobError::Panicked))
        }
    };

    if let Err(e) = &outcome {
        tracing::debug!("job {} raised: {}", job.key, e);
    }

    let execution = JobExecution {
        key: &job.key,
        fire_time,
        result: result.as_ref(),
        error: outcome.as_ref().err(),
    };
    for listener in &job.listeners {
        listener.job_was_executed(&execution, handle);
    }

    state
}
