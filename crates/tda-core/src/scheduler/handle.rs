use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;

use super::job::JobKey;

/// Cloneable control surface over a running scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Arc<Shared>,
}

struct Shared {
    shutdown: watch::Sender<bool>,
    paused: Mutex<HashMap<JobKey, bool>>,
    errored: AtomicBool,
}

impl SchedulerHandle {
    pub(super) fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(Shared {
                shutdown,
                paused: Mutex::new(HashMap::new()),
                errored: AtomicBool::new(false),
            }),
        }
    }

    fn paused(&self) -> MutexGuard<'_, HashMap<JobKey, bool>> {
        match self.inner.paused.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub(super) fn register(&self, key: &JobKey) {
        self.paused().insert(key.clone(), false);
    }

    /// Stop future firings of `key` until resumed. Returns false for unknown jobs.
    pub fn pause_job(&self, key: &JobKey) -> bool {
        match self.paused().get_mut(key) {
            Some(flag) => {
                *flag = true;
                true
            }
            None => false,
        }
    }

    pub fn resume_job(&self, key: &JobKey) -> bool {
        match self.paused().get_mut(key) {
            Some(flag) => {
                *flag = false;
                true
            }
            None => false,
        }
    }

    pub fn is_paused(&self, key: &JobKey) -> bool {
        self.paused().get(key).copied().unwrap_or(false)
    }

    /// Run `task` once after `delay`, unless the scheduler shuts down first.
    ///
    /// Must be called from within the Tokio runtime.
    pub fn schedule_once<F>(&self, delay: Duration, task: F)
    where
        F: FnOnce(&SchedulerHandle) + Send + 'static,
    {
        let handle = self.clone();
        let mut shutdown = self.subscribe_shutdown();
        tokio::spawn(async move {
            tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => {}
                _ = tokio::time::sleep(delay) => task(&handle),
            }
        });
    }

    /// Stop new firings; executions already in flight finish.
    pub fn shutdown(&self) {
        self.inner.shutdown.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.inner.shutdown.borrow()
    }

    pub(super) fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.inner.shutdown.subscribe()
    }

    pub(super) fn mark_errored(&self) {
        self.inner.errored.store(true, Ordering::SeqCst);
    }

    pub fn errored(&self) -> bool {
        self.inner.errored.load(Ordering::SeqCst)
    }
}

pub(super) async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    // A dropped sender means the scheduler is gone; treat it as shutdown.
    let _ = rx.wait_for(|stopped| *stopped).await;
}
