mod bootstrap_helpers;
mod cli_args;
mod commands;
mod runtime_setup;

use std::process::ExitCode;

use clap::Parser;
use ticbot_core::TracingSink;

use crate::bootstrap_helpers::init_tracing;
use crate::cli_args::Cli;
use crate::commands::execute_cli;

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match execute_cli(&cli, &TracingSink) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            tracing::error!("{error:#}");
            ExitCode::FAILURE
        }
    }
}
