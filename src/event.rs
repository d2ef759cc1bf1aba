//! Events: named, typed units of deferred work.
//!
//! An `Event` is created when a participant addresses another participant
//! (a *trigger*) or when the emulator arms a synthetic node failure (a
//! *disconnect*). It is owned by exactly one queue until the scheduler
//! invokes it, at which point it is consumed.

use crate::error::SimResult;
use crate::world::World;

// ── Event ID ──────────────────────────────────────────────────────────

/// A strictly increasing event identifier, unique within one run.
///
/// IDs are only handles into the event arena; scheduling order is decided
/// by queue position, never by ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EventId(u64);

impl EventId {
    /// Handle for arena key `raw`.
    #[inline]
    pub fn new(raw: u64) -> Self {
        EventId(raw)
    }

    /// The arena key.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E#{}", self.0)
    }
}

// ── Event ID Generator ───────────────────────────────────────────────

/// Hands out arena handles in creation order.
///
/// Reset together with the world on every re-execution, so replaying a
/// variant hands out the same IDs in the same order.
#[derive(Debug, Clone, Default)]
pub struct EventIdGen {
    next: u64,
}

impl EventIdGen {
    /// Start over from handle 0, as every `init` does.
    pub fn new() -> Self {
        EventIdGen { next: 0 }
    }

    /// Allocate the handle of a newly queued or armed event.
    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next);
        self.next += 1;
        id
    }
}

// ── Event Kind ────────────────────────────────────────────────────────

/// What an event models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    /// A protocol message delivery between participants.
    Trigger,
    /// A synthetic crash-stop of one node, observed by every other node.
    Disconnect,
}

impl EventKind {
    /// Whether the event delivers a protocol message.
    pub fn is_trigger(self) -> bool {
        matches!(self, EventKind::Trigger)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Trigger => write!(f, "trigger"),
            EventKind::Disconnect => write!(f, "disconnect"),
        }
    }
}

// ── Event ─────────────────────────────────────────────────────────────

/// The deferred work an event performs against the world when invoked.
pub type Action = Box<dyn FnOnce(&mut World) -> SimResult<()>>;

/// A single pending event.
pub struct Event {
    /// Arena handle.
    pub id: EventId,
    /// Display name, e.g. `Replob::Vote 0=>1` or `node disconnection: 2`.
    pub name: String,
    /// Trigger or disconnect.
    pub kind: EventKind,
    action: Action,
}

impl Event {
    /// Build an event around its action.
    pub fn new(id: EventId, name: impl Into<String>, kind: EventKind, action: Action) -> Self {
        Event {
            id,
            name: name.into(),
            kind,
            action,
        }
    }

    /// Run the action, consuming the event.
    pub fn invoke(self, world: &mut World) -> SimResult<()> {
        (self.action)(world)
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.name, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_id_monotonic() {
        let mut gen = EventIdGen::new();
        let a = gen.next_id();
        let b = gen.next_id();
        assert_eq!(a.raw(), 0);
        assert_eq!(b.raw(), 1);
        assert!(a < b);
    }

    #[test]
    fn test_event_display() {
        let e = Event::new(
            EventId::new(4),
            "node disconnection: 2",
            EventKind::Disconnect,
            Box::new(|_| Ok(())),
        );
        assert_eq!(e.id.to_string(), "E#4");
        assert_eq!(e.to_string(), "node disconnection: 2 [disconnect]");
        assert!(format!("{e:?}").contains("Disconnect"));
    }
}
