//! Pipeline logging.
//!
//! Stages report progress through the small helpers below, which emit
//! `tracing` events tagged with a `status` field. The binary installs a
//! stderr subscriber with [`init_logging`] so stdout stays free for the
//! report.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log level as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    fn status(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Success => "ok",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Emit one log line at `level`.
pub fn log(level: LogLevel, message: impl Into<String>) {
    let message = message.into();
    let status = level.status();
    match level {
        LogLevel::Debug => tracing::debug!(status, "{}", message),
        LogLevel::Info | LogLevel::Success => tracing::info!(status, "{}", message),
        LogLevel::Warning => tracing::warn!(status, "{}", message),
        LogLevel::Error => tracing::error!(status, "{}", message),
    }
}

pub fn log_debug(msg: impl Into<String>) {
    log(LogLevel::Debug, msg);
}

pub fn log_info(msg: impl Into<String>) {
    log(LogLevel::Info, msg);
}

pub fn log_success(msg: impl Into<String>) {
    log(LogLevel::Success, msg);
}

pub fn log_warning(msg: impl Into<String>) {
    log(LogLevel::Warning, msg);
}

pub fn log_error(msg: impl Into<String>) {
    log(LogLevel::Error, msg);
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `verbose` selects `debug` over
/// `info`. Calling this twice is harmless.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init();
}
