#![deny(missing_docs)]
//! Logging for the sorter workspace.
//!
//! Every crate logs through the `sorter_*` macros below. The `mdsort` binary
//! installs a terminal and/or file logger with [`initialize`]; integration
//! tests call [`initialize_for_tests`].

use std::fs::File;
use std::path::Path;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! sorter_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! sorter_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! sorter_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! sorter_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! sorter_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Where log records are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogDestination {
    /// The log file only.
    File,
    /// The terminal only.
    Terminal,
    /// Terminal and log file.
    #[default]
    Both,
}

/// Log file used by the binary, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = "./mdsort.log";

/// HTTP stack internals that drown out per-item lines at debug level.
const QUIET_TARGETS: [&str; 5] = ["hyper", "hyper_util", "h2", "rustls", "reqwest::connect"];

/// Install the global logger.
///
/// The log file is truncated on every start. If it cannot be created the
/// failure is reported on stderr and terminal logging (when requested)
/// still goes ahead.
pub fn initialize(destination: LogDestination, level: LevelFilter, log_path: &Path) {
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if matches!(destination, LogDestination::Terminal | LogDestination::Both) {
        loggers.push(terminal_logger(level));
    }
    if matches!(destination, LogDestination::File | LogDestination::Both) {
        match File::create(log_path) {
            Ok(file) => loggers.push(WriteLogger::new(level, build_config(), file)),
            Err(err) => eprintln!("Warning: cannot create log file {}: {}", log_path.display(), err),
        }
    }
    if loggers.is_empty() {
        return;
    }
    let _ = CombinedLogger::init(loggers);
}

/// Terminal logger for tests; a no-op when a logger is already installed.
pub fn initialize_for_tests() {
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = CombinedLogger::init(vec![terminal_logger(level)]);
}

fn terminal_logger(level: LevelFilter) -> Box<TermLogger> {
    TermLogger::new(level, build_config(), TerminalMode::Mixed, ColorChoice::Auto)
}

fn build_config() -> Config {
    let mut builder = ConfigBuilder::new();
    builder
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error);
    for target in QUIET_TARGETS {
        builder.add_filter_ignore_str(target);
    }
    builder.build()
}
