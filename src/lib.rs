//! ranklog - rank-aware rotating logger for multi-process jobs
//!
//! Process-local logging for distributed training and evaluation runs: only
//! one designated rank emits records, the file-backed log rotates on a time
//! interval with segments named for the start of their interval (DST
//! corrected), and every accepted record is mirrored to standard output.

pub mod config;
pub mod gate;
pub mod logger;
pub mod record;
pub mod retention;
pub mod rotation;
pub mod runtime;
pub mod sink;

pub use config::{Granularity, LoggerConfig};
pub use gate::RankGate;
pub use logger::{log_file_path, Logger};
pub use record::{basename, basename_no_ext, LogLevel, LogRecord};
pub use retention::prune_rotated_segments;
pub use rotation::RotatingSink;
pub use runtime::{DistributedRuntime, EnvRuntime};
pub use sink::{ConsoleSink, RecordSink};
