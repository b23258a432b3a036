//! Logging system for the TwinRaster engine
//!
//! This module provides:
//! - Customizable logger via the Logger trait
//! - Six severity levels, filtered through a verbosity bitmask
//! - Colored console output by default
//! - File and line information for Error and Critical entries
//!
//! There is no global logger. A [`Log`] handle is created by the entry point
//! and handed to the engine, the graphics factory and every backend.

use bitflags::bitflags;
use chrono::{DateTime, Local};
use colored::*;
use std::sync::Arc;
use std::time::SystemTime;

/// Logger trait for custom logging implementations
///
/// # Example
///
/// ```no_run
/// use twin_raster_engine::twinraster::log::{Logger, LogEntry};
///
/// struct FileLogger {
///     file: std::fs::File,
/// }
///
/// impl Logger for FileLogger {
///     fn log(&self, entry: &LogEntry) {
///         // Write to file...
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    /// Log an entry
    fn log(&self, entry: &LogEntry);
}

/// Log entry containing all information about a log message
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Severity level
    pub severity: LogSeverity,

    /// Timestamp when the log was created
    pub timestamp: SystemTime,

    /// Source module (e.g., "twinraster::Engine", "twinraster::d3d::Graphics")
    pub source: String,

    /// Log message
    pub message: String,

    /// Source file (only for detailed Error/Critical logs)
    pub file: Option<&'static str>,

    /// Source line (only for detailed Error/Critical logs)
    pub line: Option<u32>,
}

/// Log severity levels, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogSeverity {
    /// The process cannot continue
    Critical,

    /// An operation failed
    Error,

    /// Potential issue, execution continues
    Warning,

    /// Important lifecycle events
    Informational,

    /// Development information
    Diagnostic,

    /// Per-frame or per-call tracing
    DeepDiagnostic,
}

impl LogSeverity {
    /// Bit of this severity inside a [`LogVerbosity`] mask
    pub fn flag(self) -> LogVerbosity {
        match self {
            LogSeverity::Critical => LogVerbosity::CRITICAL,
            LogSeverity::Error => LogVerbosity::ERROR,
            LogSeverity::Warning => LogVerbosity::WARNING,
            LogSeverity::Informational => LogVerbosity::INFORMATIONAL,
            LogSeverity::Diagnostic => LogVerbosity::DIAGNOSTIC,
            LogSeverity::DeepDiagnostic => LogVerbosity::DEEP_DIAGNOSTIC,
        }
    }

    /// Fixed-width label used by the console and file loggers
    pub fn label(self) -> &'static str {
        match self {
            LogSeverity::Critical => "CRIT ",
            LogSeverity::Error => "ERROR",
            LogSeverity::Warning => "WARN ",
            LogSeverity::Informational => "INFO ",
            LogSeverity::Diagnostic => "DIAG ",
            LogSeverity::DeepDiagnostic => "DEEP ",
        }
    }
}

bitflags! {
    /// Verbosity mask: a severity is written only if its bit is set
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LogVerbosity: u32 {
        const CRITICAL = 1 << 0;
        const ERROR = 1 << 1;
        const WARNING = 1 << 2;
        const INFORMATIONAL = 1 << 3;
        const DIAGNOSTIC = 1 << 4;
        const DEEP_DIAGNOSTIC = 1 << 5;

        /// Critical + Error + Warning + Informational
        const STANDARD = Self::CRITICAL.bits()
            | Self::ERROR.bits()
            | Self::WARNING.bits()
            | Self::INFORMATIONAL.bits();
    }
}

impl Default for LogVerbosity {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            LogVerbosity::STANDARD | LogVerbosity::DIAGNOSTIC
        } else {
            LogVerbosity::STANDARD
        }
    }
}

/// Default logger implementation using colored console output
///
/// Format:
/// - Normal: `[timestamp] [SEVERITY] [source] message`
/// - Error/Critical: `[timestamp] [SEVERITY] [source] message (file:line)`
pub struct DefaultLogger;

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        let datetime: DateTime<Local> = entry.timestamp.into();
        let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string();

        let severity_str = match entry.severity {
            LogSeverity::Critical => entry.severity.label().white().on_red().bold(),
            LogSeverity::Error => entry.severity.label().red().bold(),
            LogSeverity::Warning => entry.severity.label().yellow(),
            LogSeverity::Informational => entry.severity.label().green(),
            LogSeverity::Diagnostic => entry.severity.label().cyan(),
            LogSeverity::DeepDiagnostic => entry.severity.label().bright_black(),
        };

        let source = entry.source.bright_blue();

        if let (Some(file), Some(line)) = (entry.file, entry.line) {
            println!(
                "[{}] [{}] [{}] {} ({}:{})",
                timestamp, severity_str, source, entry.message, file, line
            );
        } else {
            println!("[{}] [{}] [{}] {}", timestamp, severity_str, source, entry.message);
        }
    }
}

/// Logger that drops everything
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _entry: &LogEntry) {}
}

/// Injected logging capability
///
/// Cloning is cheap: all clones share the same underlying logger.
#[derive(Clone)]
pub struct Log {
    logger: Arc<dyn Logger>,
    verbosity: LogVerbosity,
}

impl Log {
    /// Wrap a logger with the given verbosity mask
    pub fn new<L: Logger + 'static>(logger: L, verbosity: LogVerbosity) -> Self {
        Self { logger: Arc::new(logger), verbosity }
    }

    /// Wrap an already shared logger
    pub fn from_shared(logger: Arc<dyn Logger>, verbosity: LogVerbosity) -> Self {
        Self { logger, verbosity }
    }

    /// Console logger with the default verbosity
    pub fn console() -> Self {
        Self::new(DefaultLogger, LogVerbosity::default())
    }

    /// Log handle that discards every entry
    pub fn silent() -> Self {
        Self::new(NullLogger, LogVerbosity::empty())
    }

    pub fn verbosity(&self) -> LogVerbosity {
        self.verbosity
    }

    /// Same logger, different mask
    pub fn with_verbosity(&self, verbosity: LogVerbosity) -> Self {
        Self { logger: Arc::clone(&self.logger), verbosity }
    }

    /// Whether entries of `severity` pass the mask
    pub fn enabled(&self, severity: LogSeverity) -> bool {
        self.verbosity.contains(severity.flag())
    }

    /// Write an entry without location information
    ///
    /// Used by macros like engine_info!, engine_warn!, etc.
    pub fn write(&self, severity: LogSeverity, source: &str, message: String) {
        if !self.enabled(severity) {
            return;
        }
        self.logger.log(&LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: None,
            line: None,
        });
    }

    /// Write an entry carrying file:line (used by engine_error! and engine_critical!)
    pub fn write_detailed(
        &self,
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        if !self.enabled(severity) {
            return;
        }
        self.logger.log(&LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: Some(file),
            line: Some(line),
        });
    }
}

impl std::fmt::Debug for Log {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Log").field("verbosity", &self.verbosity).finish()
    }
}

// ===== LOGGING MACROS =====

/// Log a CRITICAL message with file:line information
#[macro_export]
macro_rules! engine_critical {
    ($log:expr, $source:expr, $($arg:tt)*) => {
        $log.write_detailed(
            $crate::log::LogSeverity::Critical,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

/// Log an ERROR message with file:line information
///
/// # Example
///
/// ```no_run
/// # use twin_raster_engine::{engine_error, twinraster::log::Log};
/// # let log = Log::console();
/// engine_error!(log, "twinraster::Engine", "Failed to initialize: {}", "no device");
/// ```
#[macro_export]
macro_rules! engine_error {
    ($log:expr, $source:expr, $($arg:tt)*) => {
        $log.write_detailed(
            $crate::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

/// Log a WARNING message
#[macro_export]
macro_rules! engine_warn {
    ($log:expr, $source:expr, $($arg:tt)*) => {
        $log.write($crate::log::LogSeverity::Warning, $source, format!($($arg)*))
    };
}

/// Log an INFORMATIONAL message
#[macro_export]
macro_rules! engine_info {
    ($log:expr, $source:expr, $($arg:tt)*) => {
        $log.write($crate::log::LogSeverity::Informational, $source, format!($($arg)*))
    };
}

/// Log a DIAGNOSTIC message
#[macro_export]
macro_rules! engine_diag {
    ($log:expr, $source:expr, $($arg:tt)*) => {
        $log.write($crate::log::LogSeverity::Diagnostic, $source, format!($($arg)*))
    };
}

/// Log a DEEP DIAGNOSTIC message (per-frame tracing, off by default)
#[macro_export]
macro_rules! engine_trace {
    ($log:expr, $source:expr, $($arg:tt)*) => {
        $log.write($crate::log::LogSeverity::DeepDiagnostic, $source, format!($($arg)*))
    };
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
