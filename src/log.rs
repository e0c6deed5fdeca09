//! Program logging, built on `fern`.
//!
//! Info and debug messages go to stdout and warnings and errors to stderr, coloured when writing
//! to a terminal. For model runs, the same messages are also written to two plain-text log files
//! in the output folder.
use anyhow::{Context, Result, bail};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{LevelFilter, Record};
use std::env;
use std::fmt::Arguments;
use std::fs::{File, OpenOptions};
use std::io::IsTerminal;
use std::path::Path;
use std::sync::OnceLock;

static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The log level used when neither the environment nor the settings file specify one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// The environment variable used to override the log level
pub const LOG_LEVEL_ENV_VAR: &str = "GRIDPLAN_LOG_LEVEL";

/// Log file for messages below warning level
const LOG_INFO_FILE_NAME: &str = "gridplan_info.log";

/// Log file for warnings and errors
const LOG_ERROR_FILE_NAME: &str = "gridplan_error.log";

const LEVEL_COLOURS: ColoredLevelConfig = ColoredLevelConfig {
    error: Color::Red,
    warn: Color::Yellow,
    info: Color::Green,
    debug: Color::Blue,
    trace: Color::Magenta,
};

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Initialise the program logger.
///
/// The level is taken from the `GRIDPLAN_LOG_LEVEL` environment variable if set, then from
/// `settings.toml`, falling back to `info`. Valid levels are `off`, `error`, `warn`, `info`,
/// `debug` and `trace` (case insensitive).
///
/// # Arguments
///
/// * `log_level_from_settings`: The log level specified in `settings.toml`
/// * `log_file_dir`: Where to write log files. No files are written if this is `None`.
pub fn init(log_level_from_settings: Option<&str>, log_file_dir: Option<&Path>) -> Result<()> {
    let level = match env::var(LOG_LEVEL_ENV_VAR) {
        Ok(level) => parse_log_level(&level)
            .with_context(|| format!("Invalid value for {LOG_LEVEL_ENV_VAR}"))?,
        Err(_) => parse_log_level(log_level_from_settings.unwrap_or(DEFAULT_LOG_LEVEL))?,
    };

    let mut dispatch = Dispatch::new()
        .chain(
            console_format(std::io::stdout().is_terminal())
                .filter(below_warning)
                .level(level)
                .chain(std::io::stdout()),
        )
        .chain(
            console_format(std::io::stderr().is_terminal())
                .level(level.min(LevelFilter::Warn))
                .chain(std::io::stderr()),
        );

    if let Some(dir) = log_file_dir {
        // The info file always gets at least info messages, even if the console is quieter
        dispatch = dispatch
            .chain(
                Dispatch::new()
                    .filter(below_warning)
                    .format(write_log_plain)
                    .level(level.max(LevelFilter::Info))
                    .chain(create_log_file(dir, LOG_INFO_FILE_NAME)?),
            )
            .chain(
                Dispatch::new()
                    .format(write_log_plain)
                    .level(LevelFilter::Warn)
                    .chain(create_log_file(dir, LOG_ERROR_FILE_NAME)?),
            );
    }

    dispatch
        .apply()
        .context("Logger has already been initialised")?;
    let _ = LOGGER_INIT.set(());

    Ok(())
}

/// A dispatcher which formats messages for the console, with colour if requested
fn console_format(use_colour: bool) -> Dispatch {
    Dispatch::new().format(move |out, message, record| {
        if use_colour {
            write_log(out, LEVEL_COLOURS.color(record.level()), record, message);
        } else {
            write_log_plain(out, message, record);
        }
    })
}

fn below_warning(metadata: &log::Metadata) -> bool {
    metadata.level() > LevelFilter::Warn
}

/// Create (or truncate) a log file in `dir`
fn create_log_file(dir: &Path, file_name: &str) -> Result<File> {
    let path = dir.join(file_name);
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .with_context(|| format!("Could not create log file {}", path.display()))
}

/// Convert a log level string to a [`LevelFilter`]
fn parse_log_level(log_level: &str) -> Result<LevelFilter> {
    let filter = match log_level.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        unknown => bail!("Unknown log level: {unknown}"),
    };

    Ok(filter)
}

/// Whether logging has been switched off via the environment.
///
/// The HiGHS solver writes straight to the console, so it has to be silenced separately.
pub fn is_logging_disabled() -> bool {
    env::var(LOG_LEVEL_ENV_VAR).is_ok_and(|level| level.eq_ignore_ascii_case("off"))
}

/// Format a log line as `[HH:MM:SS LEVEL target] message`
fn write_log(
    out: FormatCallback,
    level: impl std::fmt::Display,
    record: &Record,
    message: &Arguments,
) {
    let time = Local::now().format("%H:%M:%S");
    out.finish(format_args!("[{time} {level} {}] {message}", record.target()));
}

fn write_log_plain(out: FormatCallback, message: &Arguments, record: &Record) {
    write_log(out, record.level(), record, message);
}
