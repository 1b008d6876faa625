//! Tracing subscriber setup
//!
//! Filter priority: `RUST_LOG` → explicit override (CLI) → config level.

use crate::config::LoggingConfig;
use crate::{Error, Result};
use std::fs::OpenOptions;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Crates whose events pass the level filter
const LOG_TARGETS: &[&str] = &["sndconv", "sndconv_common"];

/// Build the directive string for a level, e.g. `sndconv=debug,sndconv_common=debug`
pub fn filter_directives(level: &str) -> Result<String> {
    let level = Level::from_str(level.trim())
        .map_err(|_| Error::Config(format!("Invalid log level: {}", level)))?;
    let level = level.to_string().to_lowercase();

    Ok(LOG_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(","))
}

/// Install the global tracing subscriber
///
/// Logs go to stderr unless `config.file` is set, in which case they are
/// appended to that file without ANSI colours.
pub fn init_tracing(config: &LoggingConfig, level_override: Option<&str>) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let level = level_override.unwrap_or(&config.level);
            EnvFilter::new(filter_directives(level)?)
        }
    };

    let registry = tracing_subscriber::registry().with(filter);

    let result = match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            registry
                .with(
                    fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()
        }
        None => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };

    result.map_err(|e| Error::Logging(e.to_string()))
}

/// Run `f` with a warn-level subscriber writing to `writer`.
///
/// Covers startup work that runs before the configured subscriber can be
/// installed, such as loading the config that names the log level.
pub fn with_bootstrap_logging<W, T>(writer: W, f: impl FnOnce() -> T) -> T
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let subscriber = tracing_subscriber::registry()
        .with(LevelFilter::WARN)
        .with(fmt::layer().with_ansi(false).with_writer(writer));
    tracing::subscriber::with_default(subscriber, f)
}
