//! File logger that mirrors every entry to the console

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Local};
use twin_raster_engine::twinraster::log::{DefaultLogger, LogEntry, Logger};

pub struct FileLogger {
    file: Mutex<File>,
    console: DefaultLogger,
}

impl FileLogger {
    /// Create or truncate the log file at `path`
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self { file: Mutex::new(file), console: DefaultLogger })
    }
}

impl Logger for FileLogger {
    fn log(&self, entry: &LogEntry) {
        self.console.log(entry);

        let datetime: DateTime<Local> = entry.timestamp.into();
        let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f");
        let line = match (entry.file, entry.line) {
            (Some(file), Some(line)) => format!(
                "[{}] [{}] [{}] {} ({}:{})",
                timestamp,
                entry.severity.label(),
                entry.source,
                entry.message,
                file,
                line
            ),
            _ => format!("[{}] [{}] [{}] {}", timestamp, entry.severity.label(), entry.source, entry.message),
        };

        // A poisoned lock only means another thread panicked mid-write
        let mut file = match self.file.lock() {
            Ok(file) => file,
            Err(poisoned) => poisoned.into_inner(),
        };
        let _ = writeln!(file, "{}", line);
    }
}
