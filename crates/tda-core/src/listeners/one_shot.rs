use std::collections::HashSet;
use std::sync::Mutex;

use crate::scheduler::{JobExecution, JobKey, JobListener, SchedulerHandle};

/// Shuts the scheduler down once every expected job has executed at least once.
pub struct OneShotCompletionListener {
    pending: Mutex<HashSet<JobKey>>,
}

impl OneShotCompletionListener {
    pub fn new(keys: impl IntoIterator<Item = JobKey>) -> Self {
        Self {
            pending: Mutex::new(keys.into_iter().collect()),
        }
    }

    pub fn remaining(&self) -> usize {
        match self.pending.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

impl JobListener for OneShotCompletionListener {
    fn job_was_executed(&self, execution: &JobExecution<'_>, scheduler: &SchedulerHandle) {
        let mut pending = match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if pending.remove(execution.key) && pending.is_empty() {
            tracing::info!("all feeds fetched once; shutting down");
            scheduler.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{Job, JobContext, JobError, Scheduler, Trigger};
    use std::sync::Arc;
    use std::time::Duration;

    struct Noop;

    impl Job for Noop {
        fn execute(&self, _ctx: &mut JobContext<'_>) -> Result<(), JobError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn shuts_down_after_every_job_ran() {
        let keys = [JobKey::new("a", "one"), JobKey::new("b", "two")];
        let listener = Arc::new(OneShotCompletionListener::new(keys.clone()));
        let mut scheduler = Scheduler::new(2);
        for (i, key) in keys.into_iter().enumerate() {
            scheduler.schedule(
                key,
                Arc::new(Noop),
                Trigger::Recurring {
                    start_delay: Duration::from_millis(5 * i as u64),
                    interval: Duration::from_millis(20),
                },
                vec![listener.clone()],
            );
        }
        let handle = scheduler.handle();

        let exit = tokio::time::timeout(Duration::from_secs(5), scheduler.run())
            .await
            .unwrap();
        assert!(!exit.terminated_with_error);
        assert!(handle.is_shutdown());
        assert_eq!(listener.remaining(), 0);
    }
}
