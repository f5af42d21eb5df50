//! l2dkit desktop backend
//!
//! The command layer a desktop UI invokes: serde request payloads, an
//! application error type, log forwarding and persisted preferences.

mod error;
pub mod ipc;
pub mod logging;
pub mod preferences;

pub use error::AppError;
pub use logging::{FileLogSink, LogEntry, LogLevel, LogSink, ResultExt, init_logging, send_log};
pub use preferences::{Preferences, load_preferences, save_preferences};
