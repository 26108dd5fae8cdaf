//! Rank gate
//!
//! Decides, once per logging call, whether this process may emit the record.
//! In a distributed group only the target rank emits; outside any group every
//! process is treated as the sole emitter.

use std::sync::Arc;

use crate::runtime::DistributedRuntime;

/// Per-record emission gate keyed on the process rank
pub struct RankGate {
    target: usize,
    runtime: Arc<dyn DistributedRuntime>,
}

impl RankGate {
    /// Create a gate that lets only `target` emit when a group is active
    pub fn new(target: usize, runtime: Arc<dyn DistributedRuntime>) -> Self {
        Self { target, runtime }
    }

    /// Whether the current process is allowed to emit records
    ///
    /// Never errors; absence of a distributed group is a normal state and
    /// means "always emit".
    pub fn should_emit(&self) -> bool {
        if self.runtime.is_active() {
            self.runtime.rank() == self.target
        } else {
            true
        }
    }
}
