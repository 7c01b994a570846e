//! cherimoya-log
//!
//! Logger setup for function handlers. [`setup_logger`] installs a global
//! `tracing` subscriber writing to stderr, with the level taken from the
//! `LOGLEVEL` environment variable unless given explicitly. Inside the
//! function runtime (`LAMBDA_TASK_ROOT` set) timestamps are left out, since
//! the platform's log sink stamps every line itself.
//!
//! ```no_run
//! use cherimoya_log::{LoggerOptions, setup_logger, timed};
//!
//! # fn demo() -> Result<(), cherimoya_log::Error> {
//! setup_logger(LoggerOptions::named("orders"))?;
//! let total = timed("sum_orders", || (1..=10).sum::<u32>());
//! # let _ = total;
//! # Ok(()) }
//! ```

#![forbid(unsafe_code)]

mod timing;

use std::ffi::OsStr;

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

pub use timing::{timed, timed_into};

/// Environment variable holding the default level.
pub const ENV_LOGLEVEL: &str = "LOGLEVEL";
/// Set by the function runtime.
pub const ENV_LAMBDA_TASK_ROOT: &str = "LAMBDA_TASK_ROOT";
/// Level used when neither the options nor `LOGLEVEL` name one.
pub const DEFAULT_LEVEL: Level = Level::INFO;

/// Crate result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by [`setup_logger`].
#[derive(Debug, Error)]
pub enum Error {
    /// Not a level name.
    #[error("invalid log level: {0:?}")]
    InvalidLevel(String),

    /// The filter directive built from the name and level was rejected.
    #[error("invalid log filter: {0}")]
    InvalidFilter(String),
}

/// Output encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// `LEVEL target: message`, one line per event.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Options for [`setup_logger`]. Every field falls back to a default.
#[derive(Debug, Clone, Default)]
pub struct LoggerOptions {
    /// Restrict the level directive to this target; all targets when `None`.
    pub name: Option<String>,
    /// Overrides `LOGLEVEL`.
    pub level: Option<Level>,
    pub format: LogFormat,
    /// Overrides the `LAMBDA_TASK_ROOT` detection.
    pub timestamps: Option<bool>,
}

impl LoggerOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    #[must_use]
    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// Parse a level name. Accepts the `tracing` names plus `WARNING`,
/// `CRITICAL`, `FATAL` and `NOTSET`, case-insensitively.
pub fn parse_level(name: &str) -> Result<Level> {
    let name = name.trim();
    match name.to_ascii_uppercase().as_str() {
        "WARNING" => Ok(Level::WARN),
        "CRITICAL" | "FATAL" => Ok(Level::ERROR),
        "NOTSET" => Ok(Level::TRACE),
        _ => name
            .parse::<Level>()
            .map_err(|_| Error::InvalidLevel(name.to_string())),
    }
}

/// Explicit level, else the `LOGLEVEL` value, else [`DEFAULT_LEVEL`].
pub fn resolve_level(explicit: Option<Level>, env_value: Option<&str>) -> Result<Level> {
    match (explicit, env_value) {
        (Some(level), _) => Ok(level),
        (None, Some(value)) if !value.trim().is_empty() => parse_level(value),
        (None, _) => Ok(DEFAULT_LEVEL),
    }
}

/// Timestamps are written unless running inside the function runtime.
pub fn timestamps_enabled(lambda_task_root: Option<&OsStr>) -> bool {
    lambda_task_root.is_none_or(OsStr::is_empty)
}

fn filter_directive(name: Option<&str>, level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    match name {
        Some(name) if !name.is_empty() => format!("{name}={level}"),
        _ => level,
    }
}

/// Install the global subscriber.
///
/// Returns `Ok(false)` without changing anything when a subscriber is
/// already installed, so handlers may call this on every invocation.
pub fn setup_logger(opts: LoggerOptions) -> Result<bool> {
    let name = opts.name.as_deref().unwrap_or("root");
    let level = resolve_level(opts.level, std::env::var(ENV_LOGLEVEL).ok().as_deref())?;
    let timestamps = opts.timestamps.unwrap_or_else(|| {
        timestamps_enabled(std::env::var_os(ENV_LAMBDA_TASK_ROOT).as_deref())
    });

    let filter = EnvFilter::try_new(filter_directive(opts.name.as_deref(), level))
        .map_err(|e| Error::InvalidFilter(e.to_string()))?;

    let layer = fmt::layer().with_writer(std::io::stderr);
    let layer: Box<dyn Layer<Registry> + Send + Sync> = match (opts.format, timestamps) {
        (LogFormat::Text, true) => layer.boxed(),
        (LogFormat::Text, false) => layer.without_time().boxed(),
        (LogFormat::Json, true) => layer.json().boxed(),
        (LogFormat::Json, false) => layer.json().without_time().boxed(),
    };

    if tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .is_err()
    {
        tracing::info!("Logger '{name}' already initialized");
        return Ok(false);
    }

    tracing::info!("Configured logger '{name}' with level {level}.");
    Ok(true)
}
