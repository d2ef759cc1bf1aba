//! Nodes and the per-node process registry.

use std::any::TypeId;
use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::{SimError, SimResult};
use crate::queue::{QueueId, QueueRegistry};

use super::id::NodeId;
use super::process::{DelegateFn, Process, ProcessKind};
use super::service::Service;

// ── Node ──────────────────────────────────────────────────────────────

/// One simulated machine: an up/down flag and the services it hosts.
///
/// Processes are kept in registration order; lifecycle callbacks and queue
/// registration both follow it, which is what makes the frontier order
/// reproducible.
#[derive(Default)]
pub struct Node {
    on: bool,
    processes: IndexMap<TypeId, Process>,
    delegates: HashMap<TypeId, DelegateFn>,
}

impl Node {
    /// Register a service kind on this node. Registering the same type twice
    /// keeps the first registration.
    pub(crate) fn add_kind(&mut self, kind: ProcessKind) -> &mut Process {
        self.processes
            .entry(kind.type_id)
            .or_insert_with(|| Process::new(kind))
    }

    /// Whether the node is up.
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Whether `S` is registered here, regardless of the node being up.
    pub fn is_registered<S: Service>(&self) -> bool {
        self.processes.contains_key(&TypeId::of::<S>())
    }

    /// Whether the node is up and hosts `S`.
    pub fn has_process<S: Service>(&self) -> bool {
        self.on && self.is_registered::<S>()
    }

    /// Queue of the live process for `type_id`, if any.
    pub(crate) fn live_queue(&self, type_id: TypeId) -> Option<QueueId> {
        if !self.on {
            return None;
        }
        self.processes.get(&type_id).and_then(Process::queue)
    }

    pub(crate) fn process(&self, type_id: TypeId) -> Option<&Process> {
        self.processes.get(&type_id)
    }

    pub(crate) fn process_mut(&mut self, type_id: TypeId) -> Option<&mut Process> {
        self.processes.get_mut(&type_id)
    }

    /// Hosted processes in registration order.
    pub fn processes(&self) -> impl Iterator<Item = &Process> + '_ {
        self.processes.values()
    }

    /// Number of hosted processes.
    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    /// Bring the node up with fresh service instances and fresh queues.
    /// Delegates are dropped; services rebind them in `on_init`.
    pub(crate) fn create_processes(&mut self, queues: &mut QueueRegistry) {
        self.on = true;
        self.delegates.clear();
        for process in self.processes.values_mut() {
            process.create(queues);
        }
    }

    /// Take the node down and discard all of its pending events.
    pub(crate) fn shutdown_processes(&mut self, queues: &mut QueueRegistry) -> SimResult<()> {
        for process in self.processes.values_mut() {
            process.clear(queues)?;
        }
        self.on = false;
        Ok(())
    }

    pub(crate) fn bind(&mut self, lower: TypeId, delegate: DelegateFn) {
        self.delegates.insert(lower, delegate);
    }

    pub(crate) fn delegate(&self, lower: TypeId) -> Option<DelegateFn> {
        self.delegates.get(&lower).copied()
    }

    pub(crate) fn has_delegate(&self, lower: TypeId) -> bool {
        self.delegates.contains_key(&lower)
    }

    pub(crate) fn kinds(&self) -> Vec<ProcessKind> {
        self.processes.values().map(Process::kind).collect()
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("on", &self.on)
            .field("processes", &self.processes.values().collect::<Vec<_>>())
            .field("delegates", &self.delegates.len())
            .finish()
    }
}

// ── Nodes ─────────────────────────────────────────────────────────────

/// Index-addressed collection of every simulated node.
#[derive(Debug, Default)]
pub struct Nodes {
    nodes: Vec<Node>,
}

impl Nodes {
    /// `count` nodes, all down and empty.
    pub fn new(count: usize) -> Self {
        let mut nodes = Vec::with_capacity(count);
        nodes.resize_with(count, Node::default);
        Nodes { nodes }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether there are no nodes at all.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node `id`, growing the collection if it is past the end.
    pub fn sized_node(&mut self, id: NodeId) -> &mut Node {
        if id.index() >= self.nodes.len() {
            self.nodes.resize_with(id.index() + 1, Node::default);
        }
        &mut self.nodes[id.index()]
    }

    /// Node `id`, or `NodeOutOfRange`.
    pub fn node(&self, id: NodeId) -> SimResult<&Node> {
        let count = self.nodes.len();
        self.nodes
            .get(id.index())
            .ok_or(SimError::NodeOutOfRange { node: id, count })
    }

    /// Mutable node `id`, or `NodeOutOfRange`.
    pub fn node_mut(&mut self, id: NodeId) -> SimResult<&mut Node> {
        let count = self.nodes.len();
        self.nodes
            .get_mut(id.index())
            .ok_or(SimError::NodeOutOfRange { node: id, count })
    }

    /// Nodes with their ids, in index order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId::new(i), n))
    }

    /// Bring every node up.
    pub(crate) fn create(&mut self, queues: &mut QueueRegistry) {
        for node in &mut self.nodes {
            node.create_processes(queues);
        }
    }

    /// Take every node down.
    pub(crate) fn shutdown(&mut self, queues: &mut QueueRegistry) -> SimResult<()> {
        for node in &mut self.nodes {
            node.shutdown_processes(queues)?;
        }
        Ok(())
    }
}
