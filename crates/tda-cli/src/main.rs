use std::process::ExitCode;

mod cli;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI and dispatch; logging is set up per command once its flags are known.
    match CliCommand::run_from_args().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("tda error: {:#}", err);
            ExitCode::from(cli::exit_status_for(&err))
        }
    }
}
