//! `tda check` – validate a configuration file without fetching anything.

use anyhow::{Context, Result};
use std::path::Path;
use tda_core::{config, fallback, logging};

pub fn run_check(config_path: &Path) -> Result<()> {
    logging::init_logging_stderr();

    let cfg = config::load(config_path)?;
    if cfg.fallback.enabled {
        fallback::from_config(&cfg.fallback).context("fallback destination is not usable")?;
    }

    println!(
        "{}: OK ({} feeds, {} trackernet lines)",
        config_path.display(),
        cfg.feeds.len(),
        cfg.trackernet_lines().len()
    );
    for feed in &cfg.feeds {
        println!(
            "  {}.{} every {}s",
            feed.producer,
            feed.feed,
            feed.fetch_interval(&cfg).as_secs()
        );
    }
    for line in cfg.trackernet_lines() {
        println!(
            "  trackernet.{} {}s after each fetch",
            line.line_code,
            line.fetch_interval().as_secs()
        );
    }
    Ok(())
}
