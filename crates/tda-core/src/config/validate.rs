//! Semantic validation. Returns every problem found.

use std::collections::HashMap;

use super::{ArchiverConfig, FailureResponseConfig, MIN_FETCH_INTERVAL_SECS};
use crate::backoff::BackoffSettings;

pub(super) fn problems(cfg: &ArchiverConfig) -> Vec<String> {
    let mut out = Vec::new();

    if cfg.feeds.is_empty() && cfg.trackernet_lines().is_empty() {
        out.push("no feeds or trackernet lines are configured".to_string());
    }
    if let Some(trackernet) = &cfg.trackernet {
        trackernet.problems(&mut out);
    }
    if cfg.fetch_interval_secs < MIN_FETCH_INTERVAL_SECS {
        out.push(format!(
            "fetch_interval_secs must be at least {} (got {})",
            MIN_FETCH_INTERVAL_SECS, cfg.fetch_interval_secs
        ));
    }
    if cfg.call_timeout_secs == 0 {
        out.push("call_timeout_secs must be greater than zero".to_string());
    }
    if cfg.worker_threads == 0 {
        out.push("worker_threads must be greater than zero".to_string());
    }
    if cfg.fallback.enabled && cfg.fallback.base_path.is_none() {
        out.push("fallback is enabled but fallback.base_path is not set".to_string());
    }
    if let Err(e) = url::Url::parse(&cfg.database.url) {
        out.push(format!("database.url {:?} is invalid: {}", cfg.database.url, e));
    }
    failure_response_problems("failure_response", &cfg.failure_response, &mut out);

    let mut seen: HashMap<(&str, &str), usize> = HashMap::new();
    for feed in &cfg.feeds {
        *seen.entry((feed.producer.as_str(), feed.feed.as_str())).or_default() += 1;

        let id = format!("feed {} {}", feed.producer, feed.feed);
        if feed.producer.trim().is_empty() || feed.feed.trim().is_empty() {
            out.push(format!("{}: producer and feed must not be empty", id));
        }
        match url::Url::parse(&feed.feed_url) {
            Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
            Ok(u) => out.push(format!("{}: unsupported URL scheme {:?}", id, u.scheme())),
            Err(e) => out.push(format!("{}: feed_url {:?} is invalid: {}", id, feed.feed_url, e)),
        }
        if let Some(secs) = feed.fetch_interval_secs {
            if secs < MIN_FETCH_INTERVAL_SECS {
                out.push(format!(
                    "{}: fetch_interval_secs must be at least {} (got {})",
                    id, MIN_FETCH_INTERVAL_SECS, secs
                ));
            }
        }
        if let Some(fr) = &feed.failure_response {
            failure_response_problems(&format!("{}: failure_response", id), fr, &mut out);
        }
    }

    let mut duplicates: Vec<_> = seen.into_iter().filter(|(_, n)| *n > 1).collect();
    duplicates.sort();
    for ((producer, feed), _) in duplicates {
        out.push(format!(
            "feed {} {} is defined more than once; feed names must be unique",
            producer, feed
        ));
    }

    out
}

fn failure_response_problems(ctx: &str, fr: &FailureResponseConfig, out: &mut Vec<String>) {
    if let Err(e) = BackoffSettings::from(fr).validate() {
        out.push(format!("{}: {}", ctx, e));
    }
    if fr.quantum_secs == 0 {
        out.push(format!("{}: quantum_secs must be greater than zero", ctx));
    }
    if fr.max_pause_duration_secs < fr.pause_period_secs {
        out.push(format!(
            "{}: max_pause_duration_secs ({}) is shorter than pause_period_secs ({})",
            ctx, fr.max_pause_duration_secs, fr.pause_period_secs
        ));
    }
}
