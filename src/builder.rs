//! Fluent builders for world setup and exploration scenarios.
//!
//! Hide the boilerplate of creating a world, registering services and
//! wiring the explorer, while keeping every run deterministic.

use crate::config::Config;
use crate::error::SimResult;
use crate::node::process::ProcessKind;
use crate::node::{EchoService, PingService, Service};
use crate::scheduler::{ExplorationReport, FrontScheduler, Scheduler};
use crate::variant::Variant;
use crate::verify::{NamedProperty, Property, Verdict};
use crate::world::World;

// ── WorldBuilder ──────────────────────────────────────────────────────

/// Fluent builder for a [`World`].
///
/// # Example
/// ```rust
/// use kairos::builder::WorldBuilder;
///
/// let world = WorldBuilder::new()
///     .nodes(3)
///     .max_failed_nodes(1)
///     .ping(0)
///     .echo(1, 2)
///     .build()
///     .unwrap();
/// assert_eq!(world.node_count(), 3);
/// ```
pub struct WorldBuilder {
    config: Config,
    services: Vec<(ProcessKind, usize, usize)>,
}

impl WorldBuilder {
    pub fn new() -> Self {
        WorldBuilder {
            config: Config::default(),
            services: Vec::new(),
        }
    }

    // ── Config ────────────────────────────────────────────────

    /// Replace the whole configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn nodes(mut self, nodes: usize) -> Self {
        self.config.nodes = nodes;
        self
    }

    pub fn max_failed_nodes(mut self, max: usize) -> Self {
        self.config.max_failed_nodes = max;
        self
    }

    pub fn max_steps(mut self, max: usize) -> Self {
        self.config.max_steps = max;
        self
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub fn max_failures(mut self, max: usize) -> Self {
        self.config.max_failures = max;
        self
    }

    pub fn min_unreliable_node(mut self, node: usize) -> Self {
        self.config.min_unreliable_node = node;
        self
    }

    // ── Services ──────────────────────────────────────────────

    /// Register `S` on nodes `start..start + count`.
    pub fn service<S: Service>(mut self, start: usize, count: usize) -> Self {
        self.services.push((ProcessKind::of::<S>(), start, count));
        self
    }

    /// Register `S` on every configured node.
    pub fn everywhere<S: Service>(self) -> Self {
        let nodes = self.config.nodes;
        self.service::<S>(0, nodes)
    }

    /// Register a `PingService` on `node`.
    pub fn ping(self, node: usize) -> Self {
        self.service::<PingService>(node, 1)
    }

    /// Register `EchoService` on nodes `start..start + count`.
    pub fn echo(self, start: usize, count: usize) -> Self {
        self.service::<EchoService>(start, count)
    }

    // ── Build ─────────────────────────────────────────────────

    /// Validate the configuration and build the world. Registration order
    /// is preserved, so it decides queue order on every node.
    pub fn build(self) -> SimResult<World> {
        let mut world = World::new(self.config)?;
        for (kind, start, count) in self.services {
            world.register(kind, start, count);
        }
        Ok(world)
    }

    /// Build, then run one straight-line schedule. Returns the world and
    /// the number of events invoked.
    pub fn run_front(self, use_optional: bool) -> SimResult<(World, usize)> {
        let mut world = self.build()?;
        let steps = FrontScheduler::new(use_optional).run(&mut world)?;
        Ok((world, steps))
    }
}

impl Default for WorldBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ── ScenarioBuilder ───────────────────────────────────────────────────

/// Fluent builder for an exhaustive exploration.
///
/// # Example
/// ```rust
/// use kairos::builder::{ScenarioBuilder, WorldBuilder};
/// use kairos::{ensure, NodeId, PingService};
///
/// let world = WorldBuilder::new().nodes(2).ping(0).echo(1, 1).build().unwrap();
/// let report = ScenarioBuilder::new(world)
///     .assert("n0 hears back or sees the crash", |w| {
///         let ping = w.service::<PingService>(NodeId::new(0))?;
///         ensure(!ping.received.is_empty() || !ping.disconnected.is_empty(), || {
///             "silence".to_string()
///         })
///     })
///     .explore()
///     .unwrap();
/// assert!(report.is_safe());
/// ```
pub struct ScenarioBuilder {
    world: World,
    prefix: Variant,
    properties: Vec<Box<dyn Property>>,
}

impl ScenarioBuilder {
    pub fn new(world: World) -> Self {
        ScenarioBuilder {
            world,
            prefix: Variant::new(),
            properties: Vec::new(),
        }
    }

    /// Only explore continuations of `prefix`.
    pub fn prefix(mut self, prefix: Variant) -> Self {
        self.prefix = prefix;
        self
    }

    /// Add a property checked after every run.
    pub fn assert<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&World) -> Verdict + 'static,
    {
        self.properties.push(Box::new(NamedProperty::new(name, f)));
        self
    }

    /// Add a boxed property.
    pub fn property(mut self, prop: Box<dyn Property>) -> Self {
        self.properties.push(prop);
        self
    }

    /// The configured explorer, not yet run.
    pub fn scheduler(self) -> Scheduler {
        let mut scheduler = Scheduler::with_prefix(self.world, self.prefix);
        for prop in self.properties {
            scheduler.add_property(prop);
        }
        scheduler
    }

    /// Run the exploration.
    pub fn explore(self) -> SimResult<ExplorationReport> {
        self.scheduler().run()
    }
}
