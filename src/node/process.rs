//! A hosted service instance plus its event queue.

use std::any::{Any, TypeId};

use crate::error::{SimError, SimResult};
use crate::queue::{QueueId, QueueRegistry};
use crate::world::World;

use super::id::NodeId;
use super::service::{AnyService, Attach, Service};

/// Lifecycle hook run against the world for one node.
pub(crate) type LifecycleFn = fn(&mut World, NodeId) -> SimResult<()>;

/// Forwards a type-erased indication to the bound upper service.
pub(crate) type DelegateFn = fn(&mut World, NodeId, Box<dyn Any>) -> SimResult<()>;

// ── ProcessKind ───────────────────────────────────────────────────────

/// Monomorphized entry points for one `Service` type.
#[derive(Clone, Copy)]
pub(crate) struct ProcessKind {
    pub(crate) type_id: TypeId,
    pub(crate) name: &'static str,
    build: fn() -> Box<dyn AnyService>,
    pub(crate) init: LifecycleFn,
    pub(crate) disconnect: LifecycleFn,
}

impl ProcessKind {
    pub(crate) fn of<S: Service>() -> Self {
        ProcessKind {
            type_id: TypeId::of::<S>(),
            name: S::NAME,
            build: build::<S>,
            init: init::<S>,
            disconnect: disconnect::<S>,
        }
    }
}

impl std::fmt::Debug for ProcessKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ProcessKind").field(&self.name).finish()
    }
}

fn build<S: Service>() -> Box<dyn AnyService> {
    Box::new(S::default())
}

fn init<S: Service>(world: &mut World, node: NodeId) -> SimResult<()> {
    world.dispatch::<S, _>(node, |service, cx| service.on_init(cx))
}

fn disconnect<S: Service>(world: &mut World, node: NodeId) -> SimResult<()> {
    world.dispatch::<S, _>(node, |service, cx| service.on_disconnect(cx))
}

/// Delegate installed by `bind_to`/`attach_to`: unpacks an indication of
/// `L` and hands it to `U` on the same node.
pub(crate) fn forward_indication<U, L>(
    world: &mut World,
    node: NodeId,
    indication: Box<dyn Any>,
) -> SimResult<()>
where
    U: Attach<L>,
    L: Service,
{
    match indication.downcast::<L::Indication>() {
        Ok(indication) => {
            world.dispatch::<U, _>(node, move |service, cx| service.on_indication(cx, *indication))
        }
        Err(_) => Err(SimError::ServiceTypeMismatch {
            node,
            expected: L::NAME,
        }),
    }
}

// ── Process ───────────────────────────────────────────────────────────

/// A hosted service instance and the queue its triggers wait in.
pub struct Process {
    kind: ProcessKind,
    /// `None` while one of its handlers is executing.
    service: Option<Box<dyn AnyService>>,
    /// `None` until the first `create`.
    queue: Option<QueueId>,
}

impl Process {
    pub(crate) fn new(kind: ProcessKind) -> Self {
        Process {
            service: Some((kind.build)()),
            kind,
            queue: None,
        }
    }

    /// Display name of the hosted service type.
    pub fn name(&self) -> &'static str {
        self.kind.name
    }

    /// The queue registered at the last `create`.
    pub fn queue(&self) -> Option<QueueId> {
        self.queue
    }

    pub(crate) fn kind(&self) -> ProcessKind {
        self.kind
    }

    /// Rebuild the service from scratch and register a fresh queue.
    pub(crate) fn create(&mut self, queues: &mut QueueRegistry) {
        self.service = Some((self.kind.build)());
        self.queue = Some(queues.register());
    }

    /// Discard every pending event of this process.
    pub(crate) fn clear(&mut self, queues: &mut QueueRegistry) -> SimResult<()> {
        match self.queue {
            Some(queue) => queues.clear(queue),
            None => Ok(()),
        }
    }

    /// Borrow the concrete service for inspection.
    pub fn service<S: Service>(&self, node: NodeId) -> SimResult<&S> {
        let service = self.service.as_ref().ok_or(SimError::ServiceBusy {
            node,
            service: self.kind.name,
        })?;
        service
            .as_any()
            .downcast_ref::<S>()
            .ok_or(SimError::ServiceTypeMismatch {
                node,
                expected: S::NAME,
            })
    }

    /// Move the service out for the duration of a handler.
    pub(crate) fn take(&mut self, node: NodeId) -> SimResult<Box<dyn AnyService>> {
        self.service.take().ok_or(SimError::ServiceBusy {
            node,
            service: self.kind.name,
        })
    }

    pub(crate) fn restore(&mut self, service: Box<dyn AnyService>) {
        self.service = Some(service);
    }
}

impl std::fmt::Debug for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Process")
            .field("name", &self.kind.name)
            .field("queue", &self.queue)
            .field("busy", &self.service.is_none())
            .finish()
    }
}
