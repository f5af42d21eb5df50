use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use serde::Serialize;

use crate::error::AppError;

pub const LOG_FILE: &str = "log.txt";
pub const ERROR_FILE: &str = "error.log";

// The installed sink; `None` until `init_logging` is called.
static LOG_SINK: OnceLock<Box<dyn LogSink>> = OnceLock::new();

/// ログレベル定義
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Payload forwarded to the sink for every log call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: &str) -> Self {
        Self {
            level,
            message: message.to_string(),
            timestamp: jiff::Zoned::now().to_string(),
        }
    }
}

/// Receiver of log entries, usually the UI's log panel.
pub trait LogSink: Send + Sync {
    fn emit(&self, entry: &LogEntry) -> Result<(), AppError>;
}

/// Appends INFO and above to `log.txt`, and ERROR entries also to `error.log`.
#[derive(Debug, Clone)]
pub struct FileLogSink {
    log_path: PathBuf,
    error_path: PathBuf,
}

impl FileLogSink {
    pub fn new(dir: &Path) -> Self {
        Self {
            log_path: dir.join(LOG_FILE),
            error_path: dir.join(ERROR_FILE),
        }
    }

    fn append(path: &Path, line: &str) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

impl LogSink for FileLogSink {
    fn emit(&self, entry: &LogEntry) -> Result<(), AppError> {
        if entry.level < LogLevel::Info {
            return Ok(());
        }
        let line = format!(
            "{} - {} - {}",
            entry.timestamp,
            entry.level.as_str().to_uppercase(),
            entry.message
        );
        Self::append(&self.log_path, &line)?;
        if entry.level == LogLevel::Error {
            Self::append(&self.error_path, &line)?;
        }
        Ok(())
    }
}

/// Initialize the logging system with a sink
pub fn init_logging(sink: Box<dyn LogSink>) {
    if LOG_SINK.set(sink).is_err() {
        eprintln!("Warning: Logging system already initialized");
    }
}

/// Send log message to the installed sink
pub fn send_log(level: LogLevel, message: &str) {
    if let Some(sink) = LOG_SINK.get() {
        if let Err(e) = sink.emit(&LogEntry::new(level, message)) {
            eprintln!("Failed to send log message: {}", e);
        }
    } else {
        // Fallback to console if logging not initialized
        eprintln!("[{}] {}", level.as_str().to_uppercase(), message);
    }
}

/// Log AppError with automatic error-level logging
pub fn log_app_error(error: &AppError, context: Option<&str>) {
    let message = match context {
        Some(ctx) => format!("{}: {}", ctx, error),
        None => error.to_string(),
    };

    send_log(LogLevel::Error, &message);
}

/// Convenience macros for logging
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logging::send_log($crate::logging::LogLevel::Debug, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logging::send_log($crate::logging::LogLevel::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logging::send_log($crate::logging::LogLevel::Warn, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logging::send_log($crate::logging::LogLevel::Error, &format!($($arg)*))
    };
}

/// Result extension for convenient error logging
pub trait ResultExt<T, E> {
    fn log_error(self, context: Option<&str>) -> Self;
}

impl<T> ResultExt<T, AppError> for Result<T, AppError> {
    fn log_error(self, context: Option<&str>) -> Self {
        if let Err(ref error) = self {
            log_app_error(error, context);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn entry(level: LogLevel, message: &str) -> LogEntry {
        LogEntry {
            level,
            message: message.to_string(),
            timestamp: "2026-01-01T00:00:00+00:00[UTC]".to_string(),
        }
    }

    #[test]
    fn given_entry_when_serializing_then_payload_matches_ui_shape() {
        let payload = serde_json::to_value(entry(LogLevel::Warn, "skipped a.model.json")).expect("json");

        assert_eq!(
            payload,
            json!({
                "level": "warn",
                "message": "skipped a.model.json",
                "timestamp": "2026-01-01T00:00:00+00:00[UTC]"
            })
        );
    }

    #[test]
    fn given_file_sink_when_emitting_then_levels_are_routed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sink = FileLogSink::new(dir.path());

        sink.emit(&entry(LogLevel::Debug, "noise")).expect("debug");
        sink.emit(&entry(LogLevel::Info, "generated manifest")).expect("info");
        sink.emit(&entry(LogLevel::Error, "offsets failed")).expect("error");

        let log = fs::read_to_string(dir.path().join(LOG_FILE)).expect("log.txt");
        let errors = fs::read_to_string(dir.path().join(ERROR_FILE)).expect("error.log");
        assert_eq!(log.lines().count(), 2);
        assert!(!log.contains("noise"));
        assert!(log.contains(" - INFO - generated manifest"));
        assert_eq!(errors.lines().collect::<Vec<_>>(), vec![
            "2026-01-01T00:00:00+00:00[UTC] - ERROR - offsets failed"
        ]);
    }

    #[test]
    fn given_err_result_when_logging_then_result_is_returned_unchanged() {
        let result: Result<(), AppError> = Err(AppError::General("boom".to_string()));

        let result = result.log_error(Some("while testing"));

        assert!(matches!(result, Err(AppError::General(message)) if message == "boom"));
    }
}
