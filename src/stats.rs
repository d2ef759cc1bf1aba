//! Run counters.

/// Counters reset at the start of every run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Stats {
    /// Disconnect events invoked in this run.
    pub disconnects: usize,
    /// Events invoked in this run.
    pub steps: usize,
}

impl Stats {
    /// Zero every counter.
    pub fn reset(&mut self) {
        *self = Stats::default();
    }
}

/// Counters accumulated over a whole exploration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct GlobalStats {
    /// Disconnect events invoked, replays included.
    pub disconnects: usize,
    /// Runs started by the scheduler.
    pub iterations: usize,
    /// Events invoked, replays included.
    pub steps: usize,
    /// Verification failures recorded.
    pub failures: usize,
    /// Runs cut short by the step budget.
    pub truncated: usize,
}

impl std::fmt::Display for GlobalStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "iterations: {}, steps: {}, disconnects: {}, truncated: {}, failures: {}",
            self.iterations, self.steps, self.disconnects, self.truncated, self.failures
        )
    }
}
