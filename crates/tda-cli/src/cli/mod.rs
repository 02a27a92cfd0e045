//! CLI for the TDA transit data archiver.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tda_core::config::ConfigError;

use commands::{run_archiver, run_check};

/// Exit status for a software error (scheduler or runtime failure).
const EXIT_SOFTWARE: u8 = 1;
/// Exit status for a bad command line or configuration file.
const EXIT_USAGE: u8 = 2;

/// Top-level CLI for the TDA transit data archiver.
#[derive(Debug, Parser)]
#[command(name = "tda")]
#[command(version)]
#[command(about = "TDA: scheduled GTFS-realtime feed archiver", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Archive every configured feed until interrupted.
    Run {
        /// Path to the TOML configuration file.
        config: PathBuf,
        /// Fetch each feed once, then exit.
        #[arg(long)]
        one_shot: bool,
        /// Write logs here instead of the XDG state directory.
        #[arg(long, value_name = "PATH")]
        log_file: Option<PathBuf>,
    },

    /// Validate a configuration file and exit.
    Check {
        /// Path to the TOML configuration file.
        config: PathBuf,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<ExitCode> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Run {
                config,
                one_shot,
                log_file,
            } => run_archiver(&config, one_shot, log_file.as_deref()).await,
            CliCommand::Check { config } => {
                run_check(&config)?;
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

/// Configuration problems are usage errors; everything else is a software error.
pub fn exit_status_for(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<ConfigError>().is_some() {
        EXIT_USAGE
    } else {
        EXIT_SOFTWARE
    }
}
