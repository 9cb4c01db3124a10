/// Tests for the logging system
///
/// The logger slot is process-global, so tests that install a custom
/// logger are serialized.

use super::*;
use serial_test::serial;
use std::sync::{Arc, Mutex};

/// Test logger capturing entries into a shared vector.
struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn install_capture() -> Arc<Mutex<Vec<LogEntry>>> {
    let entries = Arc::new(Mutex::new(Vec::new()));
    set_logger(Box::new(CaptureLogger {
        entries: entries.clone(),
    }));
    entries
}

#[test]
#[serial]
fn test_macros_reach_installed_logger() {
    let entries = install_capture();

    crate::engine_info!("radiant::test", "hello {}", "world");
    crate::engine_warn!("radiant::test", "careful");

    let entries = entries.lock().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].severity, LogSeverity::Info);
    assert_eq!(entries[0].message, "hello world");
    assert_eq!(entries[0].source, "radiant::test");
    assert_eq!(entries[1].severity, LogSeverity::Warn);

    set_logger(Box::new(DefaultLogger));
}

#[test]
#[serial]
fn test_error_macro_carries_file_line() {
    let entries = install_capture();

    crate::engine_error!("radiant::test", "boom");

    let entries_guard = entries.lock().unwrap();
    assert_eq!(entries_guard.len(), 1);
    let entry = &entries_guard[0];
    assert_eq!(entry.severity, LogSeverity::Error);
    assert!(entry.file.is_some());
    assert!(entry.line.is_some());
    drop(entries_guard);

    set_logger(Box::new(DefaultLogger));
}

#[test]
#[serial]
fn test_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
#[serial]
fn test_default_logger_does_not_panic() {
    set_logger(Box::new(DefaultLogger));
    crate::engine_trace!("radiant::test", "trace message");
    crate::engine_debug!("radiant::test", "debug message");
}
