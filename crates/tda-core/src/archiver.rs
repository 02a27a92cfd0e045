//! Wiring: turn an [`ArchiverConfig`] into a scheduler with one archive job per
//! feed and per Trackernet line.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::backoff::random_duration;
use crate::config::ArchiverConfig;
use crate::fallback::{self, FallbackWriter};
use crate::fetch::{FeedArchiveJob, FeedDescriptor, FetchExecutor};
use crate::gtfs_rt::CodecCache;
use crate::http::{CurlHttpClient, HttpClient};
use crate::listeners::{FailureResponseListener, OneShotCompletionListener};
use crate::metrics;
use crate::scheduler::{JobKey, JobListener, Scheduler, SchedulerExit, SchedulerHandle, Trigger};
use crate::sink::{ClickHouseSink, PersistenceRouter, PrimarySink};
use crate::trackernet::{self, LineArchiveJob, TrackernetClient};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Poll every feed on its interval until shut down.
    Continuous,
    /// Fetch every feed once, then stop.
    OneShot,
}

/// `tda/<version> (curl/<version>) (<operator contact>)`, omitting absent parts.
pub fn user_agent(version: &str, curl_version: Option<&str>, operator_contact: Option<&str>) -> String {
    let mut ua = format!("tda/{}", version);
    if let Some(curl) = curl_version {
        ua.push_str(&format!(" (curl/{})", curl));
    }
    if let Some(contact) = operator_contact {
        ua.push_str(&format!(" ({})", contact));
    }
    ua
}

/// The pluggable seams of an archiver; production uses curl, ClickHouse and the configured fallback.
pub struct Components {
    pub http: Arc<dyn HttpClient>,
    pub sink: Arc<dyn PrimarySink>,
    pub fallback: Arc<dyn FallbackWriter>,
}

impl Components {
    pub fn from_config(config: &ArchiverConfig) -> Result<Self> {
        let ua = user_agent(
            VERSION,
            Some(curl::Version::get().version()),
            config.operator_contact.as_deref(),
        );
        tracing::info!("identifying as User-Agent: {}", ua);

        let sink = ClickHouseSink::new(&config.database, ua.clone(), config.call_timeout())
            .with_context(|| format!("invalid database url {}", config.database.url))?;
        let fallback =
            fallback::from_config(&config.fallback).context("failed to set up fallback writer")?;

        Ok(Self {
            http: Arc::new(CurlHttpClient::new(ua)),
            sink: Arc::new(sink),
            fallback,
        })
    }
}

pub struct Archiver {
    scheduler: Scheduler,
}

impl Archiver {
    pub fn new(config: &ArchiverConfig, mode: RunMode, components: Components) -> Result<Self> {
        let codecs = Arc::new(CodecCache::default());
        let router = Arc::new(PersistenceRouter::new(
            components.sink,
            components.fallback,
            Arc::clone(&codecs),
            config.database.table.clone(),
        ));
        let executor = Arc::new(FetchExecutor::new(
            Arc::clone(&components.http),
            codecs,
            Arc::clone(&router),
        ));

        let one_shot = match mode {
            RunMode::OneShot => Some(Arc::new(OneShotCompletionListener::new(
                config
                    .feeds
                    .iter()
                    .map(|f| JobKey::new(&f.producer, &f.feed))
                    .chain(
                        config
                            .trackernet_lines()
                            .iter()
                            .map(|l| trackernet::job_key(&l.line_code)),
                    ),
            ))),
            RunMode::Continuous => None,
        };

        let mut scheduler = Scheduler::new(config.worker_threads);
        let mut rng = rand::thread_rng();
        for feed in &config.feeds {
            let descriptor = FeedDescriptor::from_config(feed, config)
                .with_context(|| format!("invalid feed_url for {}.{}", feed.producer, feed.feed))?;
            let key = JobKey::new(&feed.producer, &feed.feed);

            let backoff = FailureResponseListener::new(feed.backoff_settings(config))
                .with_context(|| format!("invalid failure_response settings for {}", key))?;
            let mut listeners: Vec<Arc<dyn JobListener>> = vec![Arc::new(backoff)];

            let trigger = match &one_shot {
                Some(listener) => {
                    listeners.push(listener.clone());
                    Trigger::Once {
                        start_delay: Duration::ZERO,
                    }
                }
                None => {
                    let interval = feed.fetch_interval(config);
                    let start_delay = random_duration(interval, &mut rng);
                    tracing::debug!("scheduling {} every {:?}, first in {:?}", key, interval, start_delay);
                    Trigger::Recurring {
                        start_delay,
                        interval,
                    }
                }
            };

            let job = FeedArchiveJob::new(descriptor, Arc::clone(&executor));
            scheduler.schedule(key, Arc::new(job), trigger, listeners);
        }

        if let Some(tn) = &config.trackernet {
            let client = TrackernetClient::new(components.http, tn)
                .with_context(|| format!("invalid trackernet base_url {}", tn.base_url))?;
            let client = Arc::new(client);

            for line in &tn.lines {
                let key = trackernet::job_key(&line.line_code);
                let backoff = FailureResponseListener::new((&config.failure_response).into())
                    .with_context(|| format!("invalid failure_response settings for {}", key))?;
                let mut listeners: Vec<Arc<dyn JobListener>> = vec![Arc::new(backoff)];

                let trigger = match &one_shot {
                    Some(listener) => {
                        listeners.push(listener.clone());
                        Trigger::Once {
                            start_delay: Duration::ZERO,
                        }
                    }
                    None => {
                        let delay = line.fetch_interval();
                        let start_delay = random_duration(delay, &mut rng);
                        tracing::debug!(
                            "scheduling {} with {:?} between fetches, first in {:?}",
                            key,
                            delay,
                            start_delay
                        );
                        Trigger::FixedDelay { start_delay, delay }
                    }
                };

                let job = LineArchiveJob::new(line, tn, Arc::clone(&client), Arc::clone(&router));
                scheduler.schedule(key, Arc::new(job), trigger, listeners);
            }
        }

        Ok(Self { scheduler })
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.scheduler.handle()
    }

    pub fn job_count(&self) -> usize {
        self.scheduler.job_count()
    }

    /// Run until shut down by a signal, by one-shot completion, or by a scheduler error.
    pub async fn run(self) -> SchedulerExit {
        let handle = self.scheduler.handle();
        tokio::spawn(shutdown_on_signal(handle));
        tracing::info!("archiver starting with {} jobs", self.scheduler.job_count());
        let exit = self.scheduler.run().await;
        tracing::info!(terminated_with_error = exit.terminated_with_error, "archiver stopped");
        exit
    }
}

/// Production entrypoint: exporter, build info, real components, run.
pub async fn run(config: ArchiverConfig, mode: RunMode) -> Result<SchedulerExit> {
    if config.metrics.enabled {
        metrics::install_prometheus_exporter(config.metrics.bind_address)?;
    }
    metrics::record_build_info(VERSION);

    let components = Components::from_config(&config)?;
    let archiver = Archiver::new(&config, mode, components)?;
    Ok(archiver.run().await)
}

async fn shutdown_on_signal(handle: SchedulerHandle) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) = match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(term), Ok(int)) => (term, int),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("failed to install signal handlers: {}", e);
                return;
            }
        };
        tokio::select! {
            _ = sigterm.recv() => tracing::info!("received SIGTERM"),
            _ = sigint.recv() => tracing::info!("received SIGINT"),
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::info!("received Ctrl-C");
    }

    handle.shutdown();
}
