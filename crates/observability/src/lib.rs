//! Tracing setup shared by the `tabops` binary.
//!
//! Console output always goes to stderr so stdout stays clean for command
//! results. With a log directory configured, a daily-rolling file receives
//! the same events without ANSI colours.

use std::path::PathBuf;

use anyhow::Context;
use tabops_core::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_FILTER: &str = "warn,tabops=info";
const LOG_FILE_PREFIX: &str = "tabops.log";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogOptions {
    pub filter: Option<String>,
    pub json: bool,
    pub directory: Option<PathBuf>,
    /// `-v` count from the command line.
    pub verbose: u8,
}

impl From<&LoggingConfig> for LogOptions {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            filter: config.filter.clone(),
            json: config.json,
            directory: config.directory.clone(),
            verbose: 0,
        }
    }
}

/// Filter directive in precedence order: `RUST_LOG`, `-v` flags, the
/// configured filter, then [`DEFAULT_FILTER`].
pub fn filter_directive(options: &LogOptions, rust_log: Option<&str>) -> String {
    if let Some(env) = rust_log.filter(|s| !s.trim().is_empty()) {
        return env.to_string();
    }
    match options.verbose {
        0 => options
            .filter
            .clone()
            .unwrap_or_else(|| DEFAULT_FILTER.to_string()),
        1 => "warn,tabops=debug".to_string(),
        _ => "info,tabops=trace".to_string(),
    }
}

/// Install the global subscriber. Keep the returned guard alive until exit
/// so buffered file output is flushed.
pub fn init(options: &LogOptions) -> anyhow::Result<Option<WorkerGuard>> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let directive = filter_directive(options, rust_log.as_deref());
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("invalid log filter `{directive}`"))?;

    let (file_layer, guard) = match &options.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let json_layer = options
        .json
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!options.json).then(|| {
        fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}
