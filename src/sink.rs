//! Record sinks
//!
//! A sink persists or prints accepted records. The `Logger` holds its sinks as
//! an ordered list of `RecordSink` trait objects; each sink formats the record
//! independently.

use std::io::Write;

use anyhow::{Context, Result};

use crate::record::LogRecord;

/// Destination for accepted log records
///
/// # Object Safety
/// This trait is object-safe to allow `Box<dyn RecordSink>` usage.
pub trait RecordSink: Send {
    /// Format and persist one record
    ///
    /// I/O failures are fatal to the sink and are not retried.
    fn write(&mut self, record: &LogRecord) -> Result<()>;

    /// Release any held resources
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Sink that mirrors every accepted record to an output stream
///
/// No rotation, no buffering beyond a flush per record. Defaults to standard
/// output; the stream is injectable so tests can capture it.
pub struct ConsoleSink {
    out: Box<dyn Write + Send>,
}

impl ConsoleSink {
    /// Create a console sink writing to standard output
    pub fn stdout() -> Self {
        Self {
            out: Box::new(std::io::stdout()),
        }
    }

    /// Create a console sink writing to the given stream
    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self { out }
    }
}

impl RecordSink for ConsoleSink {
    fn write(&mut self, record: &LogRecord) -> Result<()> {
        writeln!(self.out, "{}", record.format_line()).context("Failed to write to console")?;
        self.out.flush().context("Failed to flush console")?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.out.flush().context("Failed to flush console")?;
        Ok(())
    }
}
