//! TraceEntry: one invoked event of the current run.

use crate::event::{EventId, EventKind};

/// A record of a single invoked event.
///
/// The world appends one per invocation and clears the list at every
/// `init`, so the trace always describes the run in progress. The `index`
/// column alone is the run's [`Variant`](crate::Variant).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TraceEntry {
    /// Position of the event in the run.
    pub step: usize,
    /// Frontier index the event was chosen at.
    pub index: usize,
    /// Handle the event had while pending.
    pub id: EventId,
    /// Trigger or disconnect.
    pub kind: EventKind,
    /// Event name, e.g. `Replob::Vote 0=>1`.
    pub name: String,
}

impl std::fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[#{} @{} {}] {} [{}]",
            self.step, self.index, self.id, self.name, self.kind
        )
    }
}
