// crates/cli/src/main.rs
//! `tabops` binary.
//!
//! Exit codes: 0 success, 1 failure, 2 refresh job finished with an error,
//! 3 refresh job was cancelled.

mod auth;
mod cli;
mod commands;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tabops_core::paths::resolve_config_path;
use tabops_core::Config;
use tabops_observability::LogOptions;
use tracing::{debug, error};

use crate::cli::Cli;
use crate::commands::{App, Outcome};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tabops: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let mut log_options = LogOptions::from(&config.logging);
    log_options.json |= cli.log_json;
    log_options.verbose = cli.verbose;
    // Held until exit so the file writer flushes.
    let _guard = match tabops_observability::init(&log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("tabops: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    debug!(environment = %config.environment, "tabops starting");

    let app = App {
        config,
        server: cli.server,
        site: cli.site,
    };
    match app.run(cli.command) {
        Ok(outcome) => {
            if outcome != Outcome::Success {
                error!(?outcome, "job did not complete successfully");
            }
            ExitCode::from(outcome.exit_code())
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let path = resolve_config_path(cli.config.as_deref(), |key| std::env::var(key).ok())?;
    Config::load(&path).with_context(|| format!("loading config {}", path.display()))
}
