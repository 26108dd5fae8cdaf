//! Logger configuration
//!
//! Holds the construction parameters for a `Logger` and the rotation
//! granularity vocabulary. Loadable from a TOML file so training jobs can
//! configure logging alongside the rest of their run settings.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// How often the file sink rotates
///
/// `Second`/`Minute`/`Hour`/`Day` are fixed-width intervals anchored at the
/// moment the schedule is computed. `Midnight` anchors at the next midnight,
/// `Week(d)` at the midnight ending weekday `d` (0 = Monday .. 6 = Sunday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Granularity {
    Second,
    Minute,
    Hour,
    Day,
    Midnight,
    Week(u8),
}

impl Granularity {
    /// Width of one rotation interval in seconds
    pub fn interval_secs(&self) -> i64 {
        match self {
            Granularity::Second => 1,
            Granularity::Minute => 60,
            Granularity::Hour => 60 * 60,
            Granularity::Day | Granularity::Midnight => 24 * 60 * 60,
            Granularity::Week(_) => 7 * 24 * 60 * 60,
        }
    }

    /// Whether rotation boundaries are pinned to a wall-clock boundary
    /// (midnight or a weekday midnight) rather than a fixed-width interval
    pub fn is_clock_anchored(&self) -> bool {
        matches!(self, Granularity::Midnight | Granularity::Week(_))
    }
}

impl Default for Granularity {
    fn default() -> Self {
        Granularity::Hour
    }
}

impl FromStr for Granularity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "second" => Ok(Granularity::Second),
            "minute" => Ok(Granularity::Minute),
            "hour" => Ok(Granularity::Hour),
            "day" => Ok(Granularity::Day),
            "midnight" => Ok(Granularity::Midnight),
            _ => {
                if let Some(day) = s.strip_prefix('w') {
                    let day: u8 = day
                        .parse()
                        .with_context(|| format!("Invalid weekday in granularity '{}'", s))?;
                    if day > 6 {
                        bail!("Weekday in granularity '{}' must be 0-6 (0 = Monday)", s);
                    }
                    return Ok(Granularity::Week(day));
                }
                bail!("Unknown rotation granularity '{}'", s)
            }
        }
    }
}

impl TryFrom<String> for Granularity {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Granularity> for String {
    fn from(g: Granularity) -> Self {
        match g {
            Granularity::Second => "second".to_string(),
            Granularity::Minute => "minute".to_string(),
            Granularity::Hour => "hour".to_string(),
            Granularity::Day => "day".to_string(),
            Granularity::Midnight => "midnight".to_string(),
            Granularity::Week(day) => format!("w{}", day),
        }
    }
}

/// Logger construction parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Directory for the log file; no file sink is built when absent
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Rank allowed to emit records (default: 0)
    #[serde(default)]
    pub rank: usize,

    /// Rotation granularity for the file sink (default: hourly)
    #[serde(default)]
    pub granularity: Granularity,

    /// Rotated segments kept before the oldest are deleted; 0 keeps all
    /// (default: 168 = one week of hourly segments)
    #[serde(default = "default_retention")]
    pub retention: usize,

    /// Schedule rotation and name segments in UTC instead of local time
    #[serde(default)]
    pub utc: bool,

    /// Emit one info record announcing the log file path at construction
    #[serde(default = "default_announce")]
    pub announce: bool,
}

fn default_retention() -> usize {
    24 * 7
}

fn default_announce() -> bool {
    true
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            directory: None,
            rank: 0,
            granularity: Granularity::default(),
            retention: default_retention(),
            utc: false,
            announce: default_announce(),
        }
    }
}

impl LoggerConfig {
    /// Load configuration from a TOML file, or return defaults if not found
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read logger config")?;
            toml::from_str(&content).context("Failed to parse logger config")
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize logger config")?;
        std::fs::write(path, content).context("Failed to write logger config")?;
        Ok(())
    }
}
