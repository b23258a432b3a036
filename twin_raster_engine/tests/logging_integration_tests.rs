//! Integration tests for the logging system
//!
//! These tests verify the Log handle through the public API and macros.
//! No graphics device required.
//!
//! Run with: cargo test --test logging_integration_tests

use std::sync::{Arc, Mutex};

use twin_raster_engine::twinraster::log::{Log, LogEntry, LogSeverity, LogVerbosity, Logger};
use twin_raster_engine::{engine_critical, engine_diag, engine_error, engine_info, engine_trace, engine_warn};

// ============================================================================
// TEST LOGGER IMPLEMENTATION
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

// ============================================================================
// LOGGING TESTS
// ============================================================================

#[test]
fn test_integration_custom_logger() {
    let (logger, entries) = TestLogger::new();
    let log = Log::new(logger, LogVerbosity::STANDARD);

    engine_info!(log, "test::module", "Test info message");
    engine_warn!(log, "test::module", "Test warning message");
    engine_error!(log, "test::module", "Test error message");

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 3);

    assert_eq!(captured[0].severity, LogSeverity::Informational);
    assert_eq!(captured[0].source, "test::module");
    assert_eq!(captured[0].message, "Test info message");

    assert_eq!(captured[1].severity, LogSeverity::Warning);
    assert_eq!(captured[1].message, "Test warning message");

    assert_eq!(captured[2].severity, LogSeverity::Error);
    assert_eq!(captured[2].message, "Test error message");
    assert!(captured[2].file.is_some());
    assert!(captured[2].line.is_some());
}

#[test]
fn test_integration_verbosity_mask() {
    let (logger, entries) = TestLogger::new();
    let log = Log::new(logger, LogVerbosity::CRITICAL | LogVerbosity::DIAGNOSTIC);

    engine_critical!(log, "test::mask", "kept");
    engine_error!(log, "test::mask", "dropped");
    engine_diag!(log, "test::mask", "kept too");
    engine_trace!(log, "test::mask", "dropped too");

    let captured = entries.lock().unwrap();
    let messages: Vec<&str> = captured.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["kept", "kept too"]);
}

#[test]
fn test_integration_clones_share_logger() {
    let (logger, entries) = TestLogger::new();
    let log = Log::new(logger, LogVerbosity::all());
    let quiet = log.with_verbosity(LogVerbosity::ERROR);
    let copy = log.clone();

    engine_info!(copy, "test::clone", "from clone");
    engine_info!(quiet, "test::clone", "filtered");
    engine_error!(quiet, "test::clone", "from quiet");

    assert_eq!(entries.lock().unwrap().len(), 2);
}

#[test]
fn test_integration_silent_log() {
    let log = Log::silent();
    assert!(!log.enabled(LogSeverity::Critical));
    engine_critical!(log, "test::silent", "nobody hears this");
}
