//! Logger bootstrap for the CLI.
//!
//! Library crates only emit through the `log` facade; this module installs
//! the backend. Output goes to stderr so stdout stays free for the JSON
//! summary.

use flexi_logger::{Logger, LoggerHandle, WriteMode};

use crate::CliError;

/// Level used when neither `--log-level` nor `RUST_LOG` is set.
pub(crate) const DEFAULT_LOG_LEVEL: &str = "info";

pub(crate) fn normalise_level(level: &str) -> Result<&'static str, CliError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        _ => Err(CliError::InvalidLogLevel {
            level: level.to_owned(),
        }),
    }
}

/// Start logging to stderr.
///
/// An explicit level wins over `RUST_LOG`. Keep the returned handle alive
/// for as long as output should be written.
pub(crate) fn init_logging(level: Option<&str>) -> Result<LoggerHandle, CliError> {
    let logger = match level {
        Some(explicit) => Logger::try_with_str(normalise_level(explicit)?)?,
        None => Logger::try_with_env_or_str(DEFAULT_LOG_LEVEL)?,
    };
    Ok(logger
        .log_to_stderr()
        .write_mode(WriteMode::Direct)
        .format(flexi_logger::default_format)
        .start()?)
}
