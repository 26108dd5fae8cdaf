//! Logger composition
//!
//! Ties together the rank gate and the sinks. A logger is built once per named
//! job at process start and lives for the process lifetime; leveled calls
//! check the gate first and touch no sink when the record is suppressed.

use std::fs;
use std::panic::Location;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};

use crate::config::LoggerConfig;
use crate::gate::RankGate;
use crate::record::{LogLevel, LogRecord};
use crate::rotation::RotatingSink;
use crate::runtime::{DistributedRuntime, EnvRuntime};
use crate::sink::{ConsoleSink, RecordSink};

/// Rank-gated logger with a rotating file sink and a console mirror
///
/// The file sink exists only when a directory is configured; the console sink
/// always does. Sinks sit behind one mutex so a rollover never interleaves
/// with another write.
pub struct Logger {
    name: String,
    gate: RankGate,
    sinks: Mutex<Vec<Box<dyn RecordSink>>>,
}

impl Logger {
    /// Create a logger reading rank information from the environment
    ///
    /// Creates the log directory if configured, discards any log file left at
    /// `<dir>/<name>.log` by a previous run of the same job, and announces the
    /// log location with one info record when configured to.
    pub fn new(name: impl Into<String>, config: LoggerConfig) -> Result<Self> {
        Self::with_runtime(name, config, Arc::new(EnvRuntime))
    }

    /// Create a logger with an explicit distributed runtime
    pub fn with_runtime(
        name: impl Into<String>,
        config: LoggerConfig,
        runtime: Arc<dyn DistributedRuntime>,
    ) -> Result<Self> {
        Self::build(name, config, runtime, ConsoleSink::stdout())
    }

    /// Create a logger writing to `dir` with default settings
    ///
    /// Rank 0, hourly rotation, one week of retention, environment-provided
    /// rank information.
    pub fn with_dir(name: impl Into<String>, dir: impl Into<std::path::PathBuf>) -> Result<Self> {
        let config = LoggerConfig {
            directory: Some(dir.into()),
            ..LoggerConfig::default()
        };
        Self::new(name, config)
    }

    fn build(
        name: impl Into<String>,
        config: LoggerConfig,
        runtime: Arc<dyn DistributedRuntime>,
        console: ConsoleSink,
    ) -> Result<Self> {
        let name = name.into();
        let mut sinks: Vec<Box<dyn RecordSink>> = Vec::new();
        let mut log_path = None;

        if let Some(dir) = &config.directory {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let path = dir.join(format!("{}.log", name));
            // Fresh start per run; the sink still opens in append mode so a
            // crash mid-run never truncates within-run history.
            if path.exists() {
                fs::remove_file(&path).with_context(|| {
                    format!("Failed to remove log file of a previous run {}", path.display())
                })?;
            }
            sinks.push(Box::new(RotatingSink::new(
                &path,
                config.granularity,
                config.retention,
                config.utc,
            )?));
            log_path = Some(path);
        }
        sinks.push(Box::new(console));

        let logger = Self {
            gate: RankGate::new(config.rank, runtime),
            name,
            sinks: Mutex::new(sinks),
        };

        if config.announce {
            if let Some(path) = log_path {
                logger.info(format!(
                    "Logger '{}' will be written at {}",
                    logger.name,
                    path.display()
                ))?;
            }
        }
        Ok(logger)
    }

    /// Name of this logger
    pub fn name(&self) -> &str {
        &self.name
    }

    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Debug, message.into(), Location::caller())
    }

    #[track_caller]
    pub fn info(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Info, message.into(), Location::caller())
    }

    #[track_caller]
    pub fn warn(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Warn, message.into(), Location::caller())
    }

    #[track_caller]
    pub fn error(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Error, message.into(), Location::caller())
    }

    fn log(&self, level: LogLevel, message: String, location: &Location<'_>) -> Result<()> {
        if !self.gate.should_emit() {
            return Ok(());
        }
        let record = LogRecord::new(
            level,
            self.name.as_str(),
            location.file(),
            location.line(),
            message,
        );
        let mut sinks = self
            .sinks
            .lock()
            .map_err(|_| anyhow!("Logger sink lock poisoned"))?;
        for sink in sinks.iter_mut() {
            sink.write(&record)?;
        }
        Ok(())
    }

    /// Flush and release all sinks
    pub fn close(&self) -> Result<()> {
        let mut sinks = self
            .sinks
            .lock()
            .map_err(|_| anyhow!("Logger sink lock poisoned"))?;
        for sink in sinks.iter_mut() {
            sink.close()?;
        }
        Ok(())
    }
}

/// Path of the log file a logger with this name would write under `dir`
pub fn log_file_path(dir: &Path, name: &str) -> std::path::PathBuf {
    dir.join(format!("{}.log", name))
}
