//! Structured error types for Kairos.
//!
//! Every fatal path in the engine returns `Result<T, SimError>`. These are
//! engine or protocol-author bugs, never findings about the explored
//! interleavings: those are reported as [`Violation`](crate::verify::Violation)s
//! by the completion check and do not travel through this type.

use thiserror::Error;

use crate::event::EventId;
use crate::node::NodeId;

/// The top-level error type for the Kairos exploration engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    // ── Node / service lookup ─────────────────────────────

    /// A node index beyond the configured node set was addressed.
    #[error("node {node} is out of range (0..{count})")]
    NodeOutOfRange { node: NodeId, count: usize },

    /// A service type was looked up on a node that never registered it.
    #[error("service {service} is not registered at node {node}")]
    ServiceNotFound { node: NodeId, service: &'static str },

    /// The registered service object is not of the requested type.
    #[error("service at node {node} is not a {expected}")]
    ServiceTypeMismatch { node: NodeId, expected: &'static str },

    /// A handler re-entered a service that is already executing.
    #[error("service {service} at node {node} is already executing")]
    ServiceBusy { node: NodeId, service: &'static str },

    /// A local indication was emitted but nothing is bound to receive it.
    #[error("service {service} at node {node} has no bound delegate")]
    DelegateMissing { node: NodeId, service: &'static str },

    // ── Fault injection ───────────────────────────────────

    /// A node inside the reliable prefix was asked to disconnect.
    #[error("node {node} is protected against disconnects")]
    ProtectedNode { node: NodeId },

    // ── Queues / events ───────────────────────────────────

    /// `front` or `pop` on an empty event queue.
    #[error("event queue {queue} is empty")]
    EmptyQueue { queue: usize },

    /// A queue handle from another run or another registry.
    #[error("event queue {queue} is not registered")]
    UnknownQueue { queue: usize },

    /// An event handle does not refer to a live event.
    #[error("event {0} does not exist")]
    UnknownEvent(EventId),

    /// A variant asked for a frontier index that is not available.
    #[error("variant step {step} selects index {index} but only {available} events are available")]
    InvalidVariantIndex {
        step: usize,
        index: usize,
        available: usize,
    },

    // ── Exploration ───────────────────────────────────────

    /// Replaying a variant produced a different event sequence.
    #[error("replay diverged at step {step}: expected `{expected}`, got `{actual}`")]
    NonDeterministicReplay {
        step: usize,
        expected: String,
        actual: String,
    },

    /// A configuration value is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A participant detected a broken internal invariant.
    #[error("protocol invariant broken: {0}")]
    Protocol(String),
}

/// Convenience alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;
