//! Recurring job scheduler.
//!
//! Each scheduled job gets its own task that fires on a fixed interval and
//! never overlaps itself. Job bodies are blocking and run on the blocking
//! pool, bounded by a shared worker limit. Listeners run on the job's task
//! right after each execution and may pause or resume jobs, schedule one-off
//! callbacks, or shut the scheduler down through [`SchedulerHandle`].

mod handle;
mod job;
mod runner;

pub use handle::SchedulerHandle;
pub use job::{Job, JobContext, JobError, JobExecution, JobKey, JobListener, Trigger};
pub use runner::{Scheduler, SchedulerExit};
