//! Exploration tunables shared by every component of one world.

use crate::error::{SimError, SimResult};

/// Process-wide knobs of a simulation.
///
/// Owned by the [`World`](crate::World); participants read it through their
/// [`ServiceContext`](crate::ServiceContext), the scheduler through the
/// world. Nothing mutates it while a run is in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct Config {
    /// Number of simulated nodes.
    pub nodes: usize,
    /// Crash-stop failures tolerated per run.
    pub max_failed_nodes: usize,
    /// Events invoked per run before the run is cut short.
    pub max_steps: usize,
    /// Runs explored before the exploration stops.
    pub max_iterations: usize,
    /// Distinct verification failures recorded before the exploration stops.
    pub max_failures: usize,
    /// Iterations between two progress reports (0 disables them).
    pub progress_interval: usize,
    /// Nodes below this index never get a disconnection event.
    pub min_unreliable_node: usize,
}

impl Config {
    /// Set the node count.
    pub fn with_nodes(mut self, nodes: usize) -> Self {
        self.nodes = nodes;
        self
    }

    /// Set the per-run fault budget.
    pub fn with_max_failed_nodes(mut self, max: usize) -> Self {
        self.max_failed_nodes = max;
        self
    }

    /// Set the per-run step budget.
    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = max;
        self
    }

    /// Set the iteration budget.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set the failure budget.
    pub fn with_max_failures(mut self, max: usize) -> Self {
        self.max_failures = max;
        self
    }

    /// Set the progress report cadence.
    pub fn with_progress_interval(mut self, every: usize) -> Self {
        self.progress_interval = every;
        self
    }

    /// Set the first node that may be disconnected.
    pub fn with_min_unreliable_node(mut self, node: usize) -> Self {
        self.min_unreliable_node = node;
        self
    }

    /// Reject configurations the engine cannot run.
    pub fn validate(&self) -> SimResult<()> {
        if self.nodes == 0 {
            return Err(SimError::InvalidConfig("at least one node is required".into()));
        }
        if self.min_unreliable_node > self.nodes {
            return Err(SimError::InvalidConfig(format!(
                "min_unreliable_node {} exceeds node count {}",
                self.min_unreliable_node, self.nodes
            )));
        }
        if self.max_steps == 0 {
            return Err(SimError::InvalidConfig("max_steps must be positive".into()));
        }
        if self.max_failures == 0 {
            return Err(SimError::InvalidConfig("max_failures must be positive".into()));
        }
        Ok(())
    }

    /// How many nodes can be disconnected at all.
    pub fn unreliable_nodes(&self) -> usize {
        self.nodes.saturating_sub(self.min_unreliable_node)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            nodes: 3,
            max_failed_nodes: 1,
            max_steps: 50,
            max_iterations: 100_000,
            max_failures: 1,
            progress_interval: 10_000,
            min_unreliable_node: 1,
        }
    }
}
