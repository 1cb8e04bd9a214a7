//! Initialisation and configuration of the program's logging.
//!
//! Messages go to the terminal (coloured if supported), with warnings and errors on stderr. When
//! an output directory is given, they are also written to two log files there: one for ordinary
//! progress messages and one for warnings and errors. The latter is where configuration defects
//! which were recovered from (missing property columns, malformed subsidy rows etc.) end up.
use anyhow::{Context, Result, bail};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{LevelFilter, Record};
use std::env;
use std::fmt::{Arguments, Display};
use std::fs::{File, OpenOptions};
use std::io::IsTerminal;
use std::path::Path;
use std::sync::OnceLock;

/// The environment variable which overrides the log level
pub const LOG_LEVEL_ENV_VAR: &str = "EMS_OPT_LOG_LEVEL";

/// The default log level for the program.
///
/// Used if the level is given neither by [`LOG_LEVEL_ENV_VAR`] nor by `settings.toml`.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Log file for progress messages
const LOG_INFO_FILE_NAME: &str = "ems_opt_info.log";

/// Log file for warnings and errors
const LOG_ERROR_FILE_NAME: &str = "ems_opt_error.log";

/// The level the logger was initialised with, if it has been
static LOGGER_LEVEL: OnceLock<LevelFilter> = OnceLock::new();

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_LEVEL.get().is_some()
}

/// Whether logging has been switched off entirely (e.g. when running tests)
pub fn is_logging_off() -> bool {
    LOGGER_LEVEL
        .get()
        .copied()
        .or_else(|| resolve_level(None).ok())
        .is_some_and(|level| level == LevelFilter::Off)
}

/// Work out the log level from the environment, the settings file or the default, in that order
fn resolve_level(level_from_settings: Option<&str>) -> Result<LevelFilter> {
    let level = env::var(LOG_LEVEL_ENV_VAR)
        .unwrap_or_else(|_| level_from_settings.unwrap_or(DEFAULT_LOG_LEVEL).to_string());

    Ok(match level.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        unknown => bail!("Unknown log level: {unknown}"),
    })
}

/// Initialise the program logger.
///
/// Possible log levels are `off`, `error`, `warn`, `info`, `debug` and `trace`.
///
/// # Arguments
///
/// * `level_from_settings`: The log level specified in `settings.toml`
/// * `log_dir`: Where to save log files (if `None`, no log files are written)
pub fn init(level_from_settings: Option<&str>, log_dir: Option<&Path>) -> Result<()> {
    let level = resolve_level(level_from_settings)?;

    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);
    let colour_stdout = std::io::stdout().is_terminal();
    let colour_stderr = std::io::stderr().is_terminal();

    let mut dispatch = Dispatch::new()
        .chain(
            // Progress messages to stdout
            Dispatch::new()
                .filter(|metadata| metadata.level() > LevelFilter::Warn)
                .format(move |out, message, record| {
                    write_log_colour(out, message, record, colour_stdout, &colours);
                })
                .level(level)
                .chain(std::io::stdout()),
        )
        .chain(
            // Warnings and errors to stderr
            Dispatch::new()
                .format(move |out, message, record| {
                    write_log_colour(out, message, record, colour_stderr, &colours);
                })
                .level(level.min(LevelFilter::Warn))
                .chain(std::io::stderr()),
        );

    if let Some(log_dir) = log_dir {
        dispatch = dispatch
            .chain(
                Dispatch::new()
                    .filter(|metadata| metadata.level() > LevelFilter::Warn)
                    .format(write_log_plain)
                    .level(level.max(LevelFilter::Info))
                    .chain(new_log_file(log_dir, LOG_INFO_FILE_NAME)?),
            )
            .chain(
                Dispatch::new()
                    .format(write_log_plain)
                    .level(LevelFilter::Warn)
                    .chain(new_log_file(log_dir, LOG_ERROR_FILE_NAME)?),
            );
    }

    dispatch.apply().context("Logger already initialised")?;
    let _ = LOGGER_LEVEL.set(level);

    Ok(())
}

/// Create (or truncate) a log file in `log_dir`
fn new_log_file(log_dir: &Path, file_name: &str) -> Result<File> {
    let path = log_dir.join(file_name);
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .with_context(|| format!("Could not create log file {}", path.display()))
}

/// Write a log message in our standard format
fn write_log<T: Display>(out: FormatCallback, level: T, target: &str, message: &Arguments) {
    let timestamp = Local::now().format("%H:%M:%S");

    out.finish(format_args!("[{timestamp} {level} {target}] {message}"));
}

/// Write to the log with no colours
fn write_log_plain(out: FormatCallback, message: &Arguments, record: &Record) {
    write_log(out, record.level(), record.target(), message);
}

/// Write to the log with colours, if `use_colour` is set
fn write_log_colour(
    out: FormatCallback,
    message: &Arguments,
    record: &Record,
    use_colour: bool,
    colours: &ColoredLevelConfig,
) {
    if use_colour {
        write_log(out, colours.color(record.level()), record.target(), message);
    } else {
        write_log_plain(out, message, record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_level_from_settings() {
        // Only meaningful when the environment variable is unset
        if env::var(LOG_LEVEL_ENV_VAR).is_err() {
            assert_eq!(resolve_level(Some("debug")).unwrap(), LevelFilter::Debug);
            assert_eq!(resolve_level(Some("WARN")).unwrap(), LevelFilter::Warn);
            assert_eq!(resolve_level(None).unwrap(), LevelFilter::Info);
            assert!(resolve_level(Some("loud")).is_err());
        }
    }
}
