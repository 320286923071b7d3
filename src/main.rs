//! distlock: command-line access to distributed locks.
//!
//! This is the main entry point for the `distlock` CLI. It parses arguments,
//! sets up logging, loads configuration, dispatches to the command handler,
//! and maps errors to exit codes.

mod cli;
mod commands;

use cli::Cli;
use distlock::{Config, exit_codes};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (e.g., `debug`, `distlock=trace`).
const LOG_ENV: &str = "DISTLOCK_LOG";

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logging();

    let result = Config::load_or_default(&cli.config)
        .and_then(|config| distlock::init(&config))
        .and_then(|manager| commands::dispatch(&manager, cli.command));

    match result {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
