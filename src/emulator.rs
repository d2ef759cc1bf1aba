//! The emulator: every pending event of the current run and the frontier
//! built from them.
//!
//! Trigger events wait in per-participant FIFO queues; disconnect events
//! wait in a separate list, one per unreliable node, armed at `init`.

use tracing::trace;

use crate::context::Context;
use crate::error::{SimError, SimResult};
use crate::event::{Action, Event, EventId, EventIdGen, EventKind};
use crate::node::{MessageKind, NodeId, Service};
use crate::queue::{QueueId, QueueRegistry};

// ── Frontier ──────────────────────────────────────────────────────────

/// Where an enabled event is waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Head of a participant queue.
    Queue(QueueId),
    /// Position in the pending-disconnect list.
    Disconnect(usize),
}

/// One entry of the frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Available {
    pub slot: Slot,
    pub id: EventId,
    pub kind: EventKind,
}

// ── Naming ────────────────────────────────────────────────────────────

/// Name of a trigger event: `Service::Message src=>dst`.
pub fn trigger_name<S: Service>(msg: &S::Message, ctx: Context) -> String {
    format!("{}::{} {}", S::NAME, msg.type_name(), ctx)
}

/// Name of a disconnect event.
pub fn disconnection_name(node: NodeId) -> String {
    format!("node disconnection: {node}")
}

// ── Emulator ──────────────────────────────────────────────────────────

/// Owns the pending events of one run.
#[derive(Debug, Default)]
pub struct Emulator {
    ids: EventIdGen,
    queues: QueueRegistry,
    disconnects: Vec<Event>,
}

impl Emulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The participant queues.
    pub fn queues(&self) -> &QueueRegistry {
        &self.queues
    }

    pub(crate) fn queues_mut(&mut self) -> &mut QueueRegistry {
        &mut self.queues
    }

    /// Number of armed, not yet invoked, disconnect events.
    pub fn pending_disconnects(&self) -> usize {
        self.disconnects.len()
    }

    /// Drop every queue and pending event and restart ID allocation.
    pub(crate) fn reset(&mut self) {
        self.ids = EventIdGen::new();
        self.queues.reset();
        self.disconnects.clear();
    }

    /// Append a trigger event to `queue`.
    pub(crate) fn push_trigger(
        &mut self,
        queue: QueueId,
        name: String,
        action: Action,
    ) -> SimResult<EventId> {
        let id = self.ids.next_id();
        trace!(%id, event = %name, queue = queue.index(), "queued");
        self.queues
            .push(queue, Event::new(id, name, EventKind::Trigger, action))?;
        Ok(id)
    }

    /// Arm the disconnect event of `node`.
    pub(crate) fn arm_disconnect(&mut self, node: NodeId, action: Action) -> EventId {
        let id = self.ids.next_id();
        self.disconnects.push(Event::new(
            id,
            disconnection_name(node),
            EventKind::Disconnect,
            action,
        ));
        id
    }

    /// Heads of every non-empty queue in registration order, followed by
    /// every pending disconnect in arming order.
    pub fn available(&self) -> Vec<Available> {
        let heads = self.queues.heads().map(|(queue, event)| Available {
            slot: Slot::Queue(queue),
            id: event.id,
            kind: event.kind,
        });
        let disconnects = self
            .disconnects
            .iter()
            .enumerate()
            .map(|(pos, event)| Available {
                slot: Slot::Disconnect(pos),
                id: event.id,
                kind: event.kind,
            });
        heads.chain(disconnects).collect()
    }

    /// Name of a frontier entry, for diagnostics.
    pub fn name_of(&self, entry: &Available) -> Option<&str> {
        let event = match entry.slot {
            Slot::Queue(_) => self.queues.event(entry.id),
            Slot::Disconnect(pos) => self.disconnects.get(pos),
        };
        event.map(|e| e.name.as_str())
    }

    /// Detach the event behind a frontier entry.
    pub(crate) fn take(&mut self, entry: &Available) -> SimResult<Event> {
        let event = match entry.slot {
            Slot::Queue(queue) => self.queues.pop(queue)?,
            Slot::Disconnect(pos) => {
                if pos >= self.disconnects.len() {
                    return Err(SimError::UnknownEvent(entry.id));
                }
                self.disconnects.remove(pos)
            }
        };
        if event.id != entry.id {
            return Err(SimError::UnknownEvent(entry.id));
        }
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Action {
        Box::new(|_| Ok(()))
    }

    #[test]
    fn test_frontier_lists_queues_then_disconnects() {
        let mut emu = Emulator::new();
        let q0 = emu.queues_mut().register();
        let q1 = emu.queues_mut().register();

        emu.arm_disconnect(NodeId::new(1), noop());
        emu.push_trigger(q1, "b".into(), noop()).unwrap();
        emu.push_trigger(q0, "a".into(), noop()).unwrap();

        let frontier = emu.available();
        assert_eq!(frontier.len(), 3);
        assert_eq!(frontier[0].slot, Slot::Queue(q0));
        assert_eq!(frontier[1].slot, Slot::Queue(q1));
        assert_eq!(frontier[2].kind, EventKind::Disconnect);
        assert_eq!(emu.name_of(&frontier[2]), Some("node disconnection: 1"));
    }

    #[test]
    fn test_take_detaches_event() {
        let mut emu = Emulator::new();
        let q = emu.queues_mut().register();
        emu.push_trigger(q, "a".into(), noop()).unwrap();
        emu.arm_disconnect(NodeId::new(2), noop());

        let frontier = emu.available();
        let disc = emu.take(&frontier[1]).unwrap();
        assert_eq!(disc.kind, EventKind::Disconnect);
        assert_eq!(emu.pending_disconnects(), 0);

        let trig = emu.take(&frontier[0]).unwrap();
        assert_eq!(trig.name, "a");
        assert!(emu.available().is_empty());
    }

    #[test]
    fn test_stale_entry_is_rejected() {
        let mut emu = Emulator::new();
        let q = emu.queues_mut().register();
        emu.push_trigger(q, "a".into(), noop()).unwrap();
        let stale = emu.available()[0];
        emu.take(&stale).unwrap();
        assert!(emu.take(&stale).is_err());
    }

    #[test]
    fn test_reset_restarts_ids() {
        let mut emu = Emulator::new();
        let q = emu.queues_mut().register();
        let first = emu.push_trigger(q, "a".into(), noop()).unwrap();
        emu.reset();
        let q = emu.queues_mut().register();
        let again = emu.push_trigger(q, "a".into(), noop()).unwrap();
        assert_eq!(first, again);
    }
}
