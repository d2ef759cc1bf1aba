//! Per-participant FIFO event queues and the registry that owns them.
//!
//! Events live in a single arena keyed by [`EventId`]; each queue is just an
//! ordered list of handles into it. The registry keeps queues in
//! registration order, which is the order the frontier enumerates them in.

use std::collections::{BTreeMap, VecDeque};

use crate::error::{SimError, SimResult};
use crate::event::{Event, EventId};

// ── QueueId ───────────────────────────────────────────────────────────

/// Handle to one registered queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueueId(usize);

impl QueueId {
    /// Registration position of the queue.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

// ── EventQueue ────────────────────────────────────────────────────────

/// Ordered event handles for one (node, participant) pair.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    ids: VecDeque<EventId>,
}

impl EventQueue {
    /// Handle of the earliest queued event.
    pub fn front(&self) -> Option<EventId> {
        self.ids.front().copied()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

// ── QueueRegistry ─────────────────────────────────────────────────────

/// Owns every pending event and every registered queue.
#[derive(Debug, Default)]
pub struct QueueRegistry {
    events: BTreeMap<EventId, Event>,
    queues: Vec<EventQueue>,
}

impl QueueRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new, empty queue at the end of the enumeration order.
    pub fn register(&mut self) -> QueueId {
        self.queues.push(EventQueue::default());
        QueueId(self.queues.len() - 1)
    }

    /// Number of registered queues.
    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }

    /// Number of events held in queues.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Append an event to the back of `queue`.
    pub fn push(&mut self, queue: QueueId, event: Event) -> SimResult<()> {
        let q = self.queue_mut(queue)?;
        q.ids.push_back(event.id);
        self.events.insert(event.id, event);
        Ok(())
    }

    /// Peek the earliest event of `queue`.
    pub fn front(&self, queue: QueueId) -> SimResult<&Event> {
        let id = self
            .queue(queue)?
            .front()
            .ok_or(SimError::EmptyQueue { queue: queue.0 })?;
        self.events.get(&id).ok_or(SimError::UnknownEvent(id))
    }

    /// Remove and return the earliest event of `queue`.
    pub fn pop(&mut self, queue: QueueId) -> SimResult<Event> {
        let id = self
            .queue_mut(queue)?
            .ids
            .pop_front()
            .ok_or(SimError::EmptyQueue { queue: queue.0 })?;
        self.events.remove(&id).ok_or(SimError::UnknownEvent(id))
    }

    /// Drop every event of `queue` without invoking it.
    pub fn clear(&mut self, queue: QueueId) -> SimResult<()> {
        let drained: Vec<EventId> = self.queue_mut(queue)?.ids.drain(..).collect();
        for id in drained {
            self.events.remove(&id);
        }
        Ok(())
    }

    /// Whether `queue` holds no event.
    pub fn is_empty(&self, queue: QueueId) -> SimResult<bool> {
        Ok(self.queue(queue)?.is_empty())
    }

    /// Forget every queue and every pending event.
    pub fn reset(&mut self) {
        self.events.clear();
        self.queues.clear();
    }

    /// Head handle of every non-empty queue, in registration order.
    pub fn heads(&self) -> impl Iterator<Item = (QueueId, &Event)> + '_ {
        self.queues.iter().enumerate().filter_map(move |(i, q)| {
            let id = q.front()?;
            self.events.get(&id).map(|e| (QueueId(i), e))
        })
    }

    /// Look up a pending event by handle.
    pub fn event(&self, id: EventId) -> Option<&Event> {
        self.events.get(&id)
    }

    fn queue(&self, queue: QueueId) -> SimResult<&EventQueue> {
        self.queues
            .get(queue.0)
            .ok_or(SimError::UnknownQueue { queue: queue.0 })
    }

    fn queue_mut(&mut self, queue: QueueId) -> SimResult<&mut EventQueue> {
        self.queues
            .get_mut(queue.0)
            .ok_or(SimError::UnknownQueue { queue: queue.0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventIdGen, EventKind};

    fn event(gen: &mut EventIdGen, name: &str) -> Event {
        Event::new(gen.next_id(), name, EventKind::Trigger, Box::new(|_| Ok(())))
    }

    #[test]
    fn test_fifo_within_queue() {
        let mut gen = EventIdGen::new();
        let mut reg = QueueRegistry::new();
        let q = reg.register();

        reg.push(q, event(&mut gen, "first")).unwrap();
        reg.push(q, event(&mut gen, "second")).unwrap();
        reg.push(q, event(&mut gen, "third")).unwrap();

        assert_eq!(reg.front(q).unwrap().name, "first");
        assert_eq!(reg.pop(q).unwrap().name, "first");
        assert_eq!(reg.pop(q).unwrap().name, "second");
        assert_eq!(reg.pop(q).unwrap().name, "third");
        assert!(reg.is_empty(q).unwrap());
    }

    #[test]
    fn test_pop_and_front_on_empty_fail() {
        let mut reg = QueueRegistry::new();
        let q = reg.register();
        assert_eq!(reg.pop(q).unwrap_err(), SimError::EmptyQueue { queue: 0 });
        assert!(reg.front(q).is_err());
    }

    #[test]
    fn test_clear_discards_without_invoking() {
        let mut gen = EventIdGen::new();
        let mut reg = QueueRegistry::new();
        let q = reg.register();
        reg.push(q, event(&mut gen, "a")).unwrap();
        reg.push(q, event(&mut gen, "b")).unwrap();

        reg.clear(q).unwrap();
        assert!(reg.is_empty(q).unwrap());
        assert_eq!(reg.event_count(), 0);
    }

    #[test]
    fn test_heads_in_registration_order() {
        let mut gen = EventIdGen::new();
        let mut reg = QueueRegistry::new();
        let q0 = reg.register();
        let q1 = reg.register();
        let q2 = reg.register();

        // Pushed in reverse queue order; heads still follow registration.
        reg.push(q2, event(&mut gen, "c1")).unwrap();
        reg.push(q0, event(&mut gen, "a1")).unwrap();
        reg.push(q0, event(&mut gen, "a2")).unwrap();

        let heads: Vec<(QueueId, String)> =
            reg.heads().map(|(q, e)| (q, e.name.clone())).collect();
        assert_eq!(heads, vec![(q0, "a1".to_string()), (q2, "c1".to_string())]);
        assert!(reg.is_empty(q1).unwrap());
    }

    #[test]
    fn test_reset_drops_everything() {
        let mut gen = EventIdGen::new();
        let mut reg = QueueRegistry::new();
        let q = reg.register();
        reg.push(q, event(&mut gen, "x")).unwrap();
        reg.reset();
        assert_eq!(reg.queue_count(), 0);
        assert_eq!(reg.event_count(), 0);
    }

    #[test]
    fn test_stale_queue_handle_is_unknown() {
        let mut gen = EventIdGen::new();
        let mut reg = QueueRegistry::new();
        let q = reg.register();
        reg.reset();
        assert_eq!(
            reg.push(q, event(&mut gen, "late")).unwrap_err(),
            SimError::UnknownQueue { queue: 0 }
        );
        assert_eq!(reg.is_empty(q).unwrap_err(), SimError::UnknownQueue { queue: 0 });
    }
}
