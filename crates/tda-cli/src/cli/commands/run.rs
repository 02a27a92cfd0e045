//! `tda run` – archive feeds until interrupted (or once, with `--one-shot`).

use anyhow::Result;
use std::path::Path;
use std::process::ExitCode;
use tda_core::archiver::{self, RunMode};
use tda_core::{config, logging};

pub async fn run_archiver(config_path: &Path, one_shot: bool, log_file: Option<&Path>) -> Result<ExitCode> {
    if let Err(e) = logging::init_logging(log_file) {
        logging::init_logging_stderr();
        tracing::warn!("file logging unavailable, using stderr: {:#}", e);
    }

    let cfg = config::load(config_path)?;
    tracing::debug!("loaded config: {:?}", cfg);

    let mode = if one_shot {
        RunMode::OneShot
    } else {
        RunMode::Continuous
    };
    let exit = archiver::run(cfg, mode).await?;

    if exit.terminated_with_error {
        tracing::error!("scheduler terminated with an error");
        Ok(ExitCode::from(crate::cli::EXIT_SOFTWARE))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
