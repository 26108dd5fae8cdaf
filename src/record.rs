//! Log records and line formatting
//!
//! A `LogRecord` captures one accepted logging call: when it happened, at what
//! level, which logger produced it, and where in the source it came from.

use chrono::{DateTime, Local};

/// Log level, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Get the display name for this level
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// A single log record
///
/// Immutable once created; built by the `Logger` and consumed by sinks.
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// Timestamp when the record was created
    pub timestamp: DateTime<Local>,
    /// Log level
    pub level: LogLevel,
    /// Name of the logger that produced the record
    pub name: String,
    /// Basename of the source file the call came from
    pub file: String,
    /// Source line of the call
    pub line: u32,
    /// Log message
    pub message: String,
}

impl LogRecord {
    /// Create a new record stamped with the current local time
    pub fn new(
        level: LogLevel,
        name: impl Into<String>,
        file: &str,
        line: u32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            name: name.into(),
            file: basename(file).to_string(),
            line,
            message: message.into(),
        }
    }

    /// Render the record as a single output line (without trailing newline)
    ///
    /// Format: `<timestamp>-<LEVEL>-<name>-<file>-<line>: <message>` with a
    /// millisecond timestamp, e.g.
    /// `2026-01-21 14:30:45,123-INFO-train-main.rs-42: epoch done`.
    pub fn format_line(&self) -> String {
        format!(
            "{},{:03}-{}-{}-{}-{}: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.timestamp.timestamp_subsec_millis(),
            self.level.as_str(),
            self.name,
            self.file,
            self.line,
            self.message
        )
    }
}

/// Get the final path component of a file path
pub fn basename(path: &str) -> &str {
    path.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(path)
}

/// Get the final path component with its extension stripped
pub fn basename_no_ext(path: &str) -> &str {
    let name = basename(path);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn test_level_as_str() {
        assert_eq!(LogLevel::Info.as_str(), "INFO");
        assert_eq!(LogLevel::Error.as_str(), "ERROR");
    }

    #[test]
    fn test_format_line() {
        let record = LogRecord::new(LogLevel::Info, "train", "src/main.rs", 42, "hello");
        let line = record.format_line();
        assert!(line.ends_with("-INFO-train-main.rs-42: hello"));
        // Timestamp prefix: "YYYY-MM-DD HH:MM:SS,mmm"
        assert_eq!(line.as_bytes()[10], b' ');
        assert_eq!(line.as_bytes()[19], b',');
    }

    #[test]
    fn test_record_keeps_file_basename() {
        let record = LogRecord::new(LogLevel::Debug, "t", "deep/nested/path/eval.rs", 7, "m");
        assert_eq!(record.file, "eval.rs");
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("a/b/c.rs"), "c.rs");
        assert_eq!(basename("c.rs"), "c.rs");
        assert_eq!(basename("a\\b\\c.rs"), "c.rs");
    }

    #[test]
    fn test_basename_no_ext() {
        assert_eq!(basename_no_ext("a/b/model.ckpt"), "model");
        assert_eq!(basename_no_ext("noext"), "noext");
        assert_eq!(basename_no_ext(".hidden"), ".hidden");
    }
}
