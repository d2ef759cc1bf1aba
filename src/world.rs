//! The world: one simulated system, with everything a run touches.
//!
//! [`World`] aggregates the configuration, the per-run and global counters,
//! the dispatch context, the nodes with their services, the emulator with
//! its pending events, and the trace of the run in progress. Services see a
//! narrow slice of it through [`ServiceContext`].

use std::any::TypeId;

use tracing::{debug, trace};

use crate::config::Config;
use crate::context::{Context, ContextCell};
use crate::emulator::{trigger_name, Available, Emulator};
use crate::error::{SimError, SimResult};
use crate::event::Action;
use crate::node::process::{forward_indication, LifecycleFn, ProcessKind};
use crate::node::{Attach, NodeId, Nodes, Service, TraceEntry};
use crate::stats::{GlobalStats, Stats};
use crate::variant::Variant;

// ── World ─────────────────────────────────────────────────────────────

/// A complete simulated system.
///
/// Built once, then restarted from scratch with [`init`](World::init) for
/// every run. Between two `init` calls the only thing that changes the
/// world is [`invoke`](World::invoke).
#[derive(Debug)]
pub struct World {
    config: Config,
    stats: Stats,
    global: GlobalStats,
    context: ContextCell,
    nodes: Nodes,
    emulator: Emulator,
    trace: Vec<TraceEntry>,
}

impl World {
    /// An empty world of `config.nodes` nodes.
    pub fn new(config: Config) -> SimResult<Self> {
        config.validate()?;
        let nodes = Nodes::new(config.nodes);
        Ok(World {
            config,
            stats: Stats::default(),
            global: GlobalStats::default(),
            context: ContextCell::default(),
            nodes,
            emulator: Emulator::new(),
            trace: Vec::new(),
        })
    }

    // ── Registration ──────────────────────────────────────────────────

    /// Register `S` on nodes `start..start + count`, growing the node
    /// collection if needed. Takes effect at the next `init`.
    pub fn create<S: Service>(&mut self, start: usize, count: usize) -> &mut Self {
        self.register(ProcessKind::of::<S>(), start, count);
        self
    }

    pub(crate) fn register(&mut self, kind: ProcessKind, start: usize, count: usize) {
        for i in start..start + count {
            self.nodes.sized_node(NodeId::new(i)).add_kind(kind);
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Adjust the configuration between explorations.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn global_stats(&self) -> &GlobalStats {
        &self.global
    }

    pub(crate) fn global_stats_mut(&mut self) -> &mut GlobalStats {
        &mut self.global
    }

    /// The context of the event executing right now.
    pub fn context(&self) -> Context {
        self.context.get()
    }

    pub fn nodes(&self) -> &Nodes {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether `node` exists and is up.
    pub fn is_live(&self, node: NodeId) -> bool {
        self.nodes.node(node).map(|n| n.is_on()).unwrap_or(false)
    }

    pub fn emulator(&self) -> &Emulator {
        &self.emulator
    }

    /// Events invoked since the last `init`.
    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    /// The frontier indices chosen since the last `init`.
    pub fn variant(&self) -> Variant {
        self.trace.iter().map(|e| e.index).collect()
    }

    /// Whether one more disconnect fits in this run's fault budget.
    pub fn disconnect_allowed(&self) -> bool {
        self.stats.disconnects < self.config.max_failed_nodes
    }

    /// The `S` instance hosted on `node`.
    pub fn service<S: Service>(&self, node: NodeId) -> SimResult<&S> {
        self.nodes
            .node(node)?
            .process(TypeId::of::<S>())
            .ok_or(SimError::ServiceNotFound {
                node,
                service: S::NAME,
            })?
            .service::<S>(node)
    }

    // ── Run lifecycle ─────────────────────────────────────────────────

    /// Restart the world: drop every pending event, rebuild every service,
    /// run every `on_init`, then arm one disconnect per unreliable node.
    pub fn init(&mut self) -> SimResult<()> {
        self.nodes.shutdown(self.emulator.queues_mut())?;
        self.emulator.reset();
        self.stats.reset();
        self.trace.clear();
        self.context.set(Context::default());

        self.nodes.create(self.emulator.queues_mut());
        for i in 0..self.nodes.len() {
            let node = NodeId::new(i);
            let _guard = self.context.enter(Context::new(None, Some(node)));
            self.init_processes(node)?;
        }

        for i in self.config.min_unreliable_node..self.nodes.len() {
            let node = NodeId::new(i);
            let action: Action = Box::new(move |world: &mut World| world.disconnect(node));
            self.emulator.arm_disconnect(node, action);
        }
        trace!(
            queues = self.emulator.queues().queue_count(),
            pending = self.emulator.queues().event_count(),
            "world initialized"
        );
        if tracing::enabled!(tracing::Level::DEBUG) {
            self.log_available();
        }
        Ok(())
    }

    /// Queue `msg` for the `S` instance on `dst`, sent from the current
    /// node. Returns `false` without queuing when `dst` is down or does not
    /// host `S`.
    pub fn trigger<S: Service>(&mut self, dst: NodeId, msg: S::Message) -> SimResult<bool> {
        let Some(queue) = self.nodes.node(dst)?.live_queue(TypeId::of::<S>()) else {
            trace!(service = S::NAME, node = %dst, "trigger dropped, no live participant");
            return Ok(false);
        };
        let ctx = self.context.get().destination(dst);
        let name = trigger_name::<S>(&msg, ctx);
        let action: Action = Box::new(move |world: &mut World| world.deliver::<S>(ctx, dst, msg));
        self.emulator.push_trigger(queue, name, action)?;
        Ok(true)
    }

    /// The frontier: every enabled event, queue heads first.
    pub fn available(&self) -> Vec<Available> {
        self.emulator.available()
    }

    /// Invoke frontier entry `index`: detach it, record it in the trace,
    /// then run it.
    pub fn invoke(&mut self, index: usize) -> SimResult<()> {
        let frontier = self.available();
        let entry = frontier
            .get(index)
            .ok_or(SimError::InvalidVariantIndex {
                step: self.stats.steps,
                index,
                available: frontier.len(),
            })?;
        let event = self.emulator.take(entry)?;
        trace!(step = self.stats.steps, index, event = %event, "invoking");

        self.trace.push(TraceEntry {
            step: self.stats.steps,
            index,
            id: event.id,
            kind: event.kind,
            name: event.name.clone(),
        });
        self.stats.steps += 1;
        self.global.steps += 1;
        event.invoke(self)
    }

    /// Dump the frontier at debug level.
    pub fn log_available(&self) {
        for (index, entry) in self.available().iter().enumerate() {
            let name = self.emulator.name_of(entry).unwrap_or("?");
            debug!(index, id = %entry.id, kind = %entry.kind, event = name, "available");
        }
    }

    /// Crash-stop `node`: it goes down and loses its pending events, then
    /// every other live node observes the failure.
    pub fn disconnect(&mut self, node: NodeId) -> SimResult<()> {
        let count = self.nodes.len();
        if node.index() >= count {
            return Err(SimError::NodeOutOfRange { node, count });
        }
        if node.index() < self.config.min_unreliable_node {
            return Err(SimError::ProtectedNode { node });
        }
        self.stats.disconnects += 1;
        self.global.disconnects += 1;
        debug!(%node, disconnects = self.stats.disconnects, "disconnecting node");

        self.nodes
            .node_mut(node)?
            .shutdown_processes(self.emulator.queues_mut())?;
        for peer in (0..count).map(NodeId::new).filter(|&peer| peer != node) {
            let _guard = self.context.enter(Context::new(Some(node), Some(peer)));
            self.disconnect_processes(peer)?;
        }
        Ok(())
    }

    fn init_processes(&mut self, node: NodeId) -> SimResult<()> {
        let hooks: Vec<LifecycleFn> = self
            .nodes
            .node(node)?
            .kinds()
            .iter()
            .map(|k| k.init)
            .collect();
        for hook in hooks {
            hook(self, node)?;
        }
        Ok(())
    }

    fn disconnect_processes(&mut self, node: NodeId) -> SimResult<()> {
        let target = self.nodes.node(node)?;
        if !target.is_on() {
            return Ok(());
        }
        let hooks: Vec<LifecycleFn> = target.kinds().iter().map(|k| k.disconnect).collect();
        for hook in hooks {
            hook(self, node)?;
        }
        Ok(())
    }

    // ── Dispatch ──────────────────────────────────────────────────────

    fn deliver<S: Service>(&mut self, ctx: Context, dst: NodeId, msg: S::Message) -> SimResult<()> {
        let _guard = self.context.enter(ctx);
        self.dispatch::<S, _>(dst, move |service, cx| service.on_message(cx, msg))
    }

    /// Run one handler of the `S` instance on `node`, then forward the
    /// indications it emitted to the bound upper service.
    pub(crate) fn dispatch<S, F>(&mut self, node: NodeId, handler: F) -> SimResult<()>
    where
        S: Service,
        F: FnOnce(&mut S, &mut ServiceContext<'_, S>) -> SimResult<()>,
    {
        let type_id = TypeId::of::<S>();
        let mut boxed = self
            .nodes
            .node_mut(node)?
            .process_mut(type_id)
            .ok_or(SimError::ServiceNotFound {
                node,
                service: S::NAME,
            })?
            .take(node)?;

        let outcome = match boxed.as_any_mut().downcast_mut::<S>() {
            Some(service) => {
                let mut cx = ServiceContext::new(self, node);
                handler(service, &mut cx).map(|()| cx.indications)
            }
            None => Err(SimError::ServiceTypeMismatch {
                node,
                expected: S::NAME,
            }),
        };

        if let Some(process) = self.nodes.node_mut(node)?.process_mut(type_id) {
            process.restore(boxed);
        }

        for indication in outcome? {
            let delegate = self
                .nodes
                .node(node)?
                .delegate(type_id)
                .ok_or(SimError::DelegateMissing {
                    node,
                    service: S::NAME,
                })?;
            delegate(self, node, Box::new(indication))?;
        }
        Ok(())
    }
}

// ── ServiceContext ────────────────────────────────────────────────────

/// What a running handler of service `S` may do to the world.
///
/// Every trigger issued here is sent from the handler's node: the event
/// will run with that node as its source.
pub struct ServiceContext<'a, S: Service> {
    world: &'a mut World,
    node: NodeId,
    indications: Vec<S::Indication>,
}

impl<'a, S: Service> ServiceContext<'a, S> {
    fn new(world: &'a mut World, node: NodeId) -> Self {
        ServiceContext {
            world,
            node,
            indications: Vec::new(),
        }
    }

    /// Node running this handler.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Full dispatch context.
    pub fn context(&self) -> Context {
        self.world.context()
    }

    /// Node the current event came from. For `on_disconnect` this is the
    /// failed node; for `on_init` it is `None`.
    pub fn source(&self) -> Option<NodeId> {
        self.world.context().source
    }

    pub fn config(&self) -> &Config {
        self.world.config()
    }

    pub fn node_count(&self) -> usize {
        self.world.node_count()
    }

    /// Whether `node` is up and hosts `T`.
    pub fn is_live_at<T: Service>(&self, node: NodeId) -> bool {
        self.world
            .nodes
            .node(node)
            .map(|n| n.has_process::<T>())
            .unwrap_or(false)
    }

    /// Queue `msg` for service `T` on `dst`.
    pub fn trigger<T: Service>(&mut self, dst: NodeId, msg: T::Message) -> SimResult<bool> {
        self.world.trigger::<T>(dst, msg)
    }

    /// Queue `msg` for service `T` on this node.
    pub fn trigger_local<T: Service>(&mut self, msg: T::Message) -> SimResult<bool> {
        let node = self.node;
        self.world.trigger::<T>(node, msg)
    }

    /// Queue `msg` for this very service on this node.
    pub fn trigger_self(&mut self, msg: S::Message) -> SimResult<bool> {
        self.trigger_local::<S>(msg)
    }

    /// Queue `msg` for the same service type on `dst`.
    pub fn trigger_peer(&mut self, dst: NodeId, msg: S::Message) -> SimResult<bool> {
        self.world.trigger::<S>(dst, msg)
    }

    /// Queue `msg` for `T` on nodes in index order, skipping nodes where it
    /// is refused, until `limit` deliveries were queued. `None` means no
    /// limit. Returns how many were queued.
    pub fn trigger_any<T: Service>(&mut self, msg: T::Message, limit: Option<usize>) -> SimResult<usize> {
        let mut queued = 0;
        for i in 0..self.world.node_count() {
            if limit.is_some_and(|l| queued >= l) {
                break;
            }
            if self.world.trigger::<T>(NodeId::new(i), msg.clone())? {
                queued += 1;
            }
        }
        Ok(queued)
    }

    /// Queue `msg` for `T` on every live node hosting it.
    pub fn trigger_all<T: Service>(&mut self, msg: T::Message) -> SimResult<usize> {
        self.trigger_any::<T>(msg, None)
    }

    /// Like [`trigger_all`](Self::trigger_all), skipping this node.
    pub fn trigger_all_except_self<T: Service>(&mut self, msg: T::Message) -> SimResult<usize> {
        let mut queued = 0;
        for i in 0..self.world.node_count() {
            let dst = NodeId::new(i);
            if dst != self.node && self.world.trigger::<T>(dst, msg.clone())? {
                queued += 1;
            }
        }
        Ok(queued)
    }

    /// Receive the indications of `L` on this node.
    pub fn bind_to<L: Service>(&mut self) -> SimResult<()>
    where
        S: Attach<L>,
    {
        let node = self.node;
        let target = self.world.nodes.node_mut(node)?;
        if !target.is_registered::<L>() {
            return Err(SimError::ServiceNotFound {
                node,
                service: L::NAME,
            });
        }
        target.bind(TypeId::of::<L>(), forward_indication::<S, L>);
        trace!(%node, upper = S::NAME, lower = L::NAME, "bound");
        Ok(())
    }

    /// Send this service's indications to `U` on this node.
    pub fn attach_to<U: Attach<S>>(&mut self) -> SimResult<()> {
        let node = self.node;
        let target = self.world.nodes.node_mut(node)?;
        if !target.is_registered::<U>() {
            return Err(SimError::ServiceNotFound {
                node,
                service: U::NAME,
            });
        }
        target.bind(TypeId::of::<S>(), forward_indication::<U, S>);
        trace!(%node, upper = U::NAME, lower = S::NAME, "attached");
        Ok(())
    }

    /// Whether some upper service receives this service's indications.
    pub fn has_listener(&self) -> bool {
        self.world
            .nodes
            .node(self.node)
            .map(|n| n.has_delegate(TypeId::of::<S>()))
            .unwrap_or(false)
    }

    /// Hand `indication` to the bound upper service once this handler
    /// returns.
    pub fn indicate(&mut self, indication: S::Indication) {
        self.indications.push(indication);
    }
}
