//! Distributed runtime capability
//!
//! The logger never queries global process state directly. Instead it is handed
//! an implementation of `DistributedRuntime` describing whether the process is
//! part of a distributed group and, if so, which rank it holds. Production code
//! uses `EnvRuntime`, which reads the `RANK`/`WORLD_SIZE` environment variables
//! set by the usual distributed launchers.

/// Ambient distributed-group information
///
/// # Object Safety
/// This trait is object-safe to allow `Arc<dyn DistributedRuntime>` usage.
pub trait DistributedRuntime: Send + Sync {
    /// Whether a distributed process group is active
    fn is_active(&self) -> bool;

    /// Rank of the current process within the group
    ///
    /// Only meaningful when `is_active()` returns true.
    fn rank(&self) -> usize;
}

/// Runtime backed by the launcher's environment variables
///
/// Considered active when both `RANK` and `WORLD_SIZE` are set and parse as
/// integers, mirroring the convention of `torchrun`-style launchers. Malformed
/// or missing variables degrade to "not active"; this is never an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvRuntime;

impl EnvRuntime {
    fn env_rank() -> Option<usize> {
        let rank = std::env::var("RANK").ok()?.parse().ok()?;
        let _world_size: usize = std::env::var("WORLD_SIZE").ok()?.parse().ok()?;
        Some(rank)
    }
}

impl DistributedRuntime for EnvRuntime {
    fn is_active(&self) -> bool {
        Self::env_rank().is_some()
    }

    fn rank(&self) -> usize {
        Self::env_rank().unwrap_or(0)
    }
}

/// Fixed runtime for tests
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct StaticRuntime {
    pub active: bool,
    pub rank: usize,
}

#[cfg(test)]
impl DistributedRuntime for StaticRuntime {
    fn is_active(&self) -> bool {
        self.active
    }

    fn rank(&self) -> usize {
        self.rank
    }
}
