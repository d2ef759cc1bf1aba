//! Schedulers: drivers that pick which enabled event runs next.
//!
//! [`FrontScheduler`] walks a single straight line through the frontier.
//! [`Scheduler`] explores every interleaving depth-first: each iteration
//! replays one [`Variant`] from a fresh world, extends it greedily with the
//! first enabled trigger, and pushes every other enabled choice onto the
//! worklist as a sibling variant. Every completed run is checked against
//! the registered properties; a failing run is replayed verbosely and
//! recorded.

use tracing::{debug, info, warn};

use crate::error::{SimError, SimResult};
use crate::event::EventKind;
use crate::stats::GlobalStats;
use crate::variant::{Variant, Variants};
use crate::verify::{NamedProperty, Property, Verdict};
use crate::world::World;

// ── FrontScheduler ────────────────────────────────────────────────────

/// Straight-line driver: always invokes the head of the frontier.
///
/// With `use_optional` unset it stops at the first disconnect reaching the
/// head; with it set, disconnects are taken while the fault budget allows.
/// Every run is also cut at `max_steps`.
#[derive(Debug, Clone, Copy)]
pub struct FrontScheduler {
    use_optional: bool,
}

impl FrontScheduler {
    pub fn new(use_optional: bool) -> Self {
        FrontScheduler { use_optional }
    }

    /// Re-initialize `world` and run it to completion. Returns the number of
    /// events invoked.
    pub fn run(&self, world: &mut World) -> SimResult<usize> {
        world.init()?;
        world.global_stats_mut().iterations += 1;
        let mut steps = 0;
        while steps < world.config().max_steps {
            let Some(head) = world.available().first().copied() else {
                break;
            };
            if head.kind == EventKind::Disconnect
                && !(self.use_optional && world.disconnect_allowed())
            {
                break;
            }
            world.invoke(0)?;
            steps += 1;
        }
        debug!(steps, "straight-line run finished");
        Ok(steps)
    }
}

// ── Failure ───────────────────────────────────────────────────────────

/// A run whose end state violated a property.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Failure {
    /// Name of the violated property.
    pub property: String,
    /// The schedule that reproduces the failure.
    pub variant: Variant,
    /// Human-readable violation message.
    pub message: String,
    /// Names of the invoked events, in order.
    pub trace: Vec<String>,
}

// ── ExplorationReport ─────────────────────────────────────────────────

/// Summary of a completed exploration.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ExplorationReport {
    /// Runs executed by this exploration.
    pub iterations: usize,
    /// Property failures recorded.
    pub failures: Vec<Failure>,
    /// Whether the worklist ran dry (every reachable variant explored).
    pub exhausted: bool,
    /// Whether the exploration stopped on the failure budget.
    pub aborted: bool,
    /// Counters accumulated by the world, replays included.
    pub stats: GlobalStats,
}

impl ExplorationReport {
    /// Whether all properties held on every explored run.
    pub fn is_safe(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of failures found.
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Pretty-printed JSON of the whole report.
    #[cfg(feature = "serialize")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// ── Scheduler ─────────────────────────────────────────────────────────

/// Exhaustive depth-first explorer of event interleavings.
///
/// # Example
///
/// ```rust
/// use kairos::{ensure, Config, EchoService, NodeId, PingService, Scheduler, World};
///
/// let mut world = World::new(Config::default().with_nodes(3)).unwrap();
/// world.create::<PingService>(0, 1).create::<EchoService>(1, 2);
///
/// let mut scheduler = Scheduler::new(world);
/// scheduler.check("every echo answers or crashes", |w| {
///     let ping = w.service::<PingService>(NodeId::new(0))?;
///     let heard = ping.received.len() + ping.disconnected.len();
///     ensure(heard >= 2, || format!("only {heard} answers"))
/// });
/// let report = scheduler.run().unwrap();
/// assert!(report.exhausted);
/// assert!(report.is_safe());
/// ```
pub struct Scheduler {
    world: World,
    properties: Vec<Box<dyn Property>>,
    variants: Variants,
    failures: Vec<Failure>,
}

impl Scheduler {
    /// An explorer starting from the empty variant.
    pub fn new(world: World) -> Self {
        Self::with_prefix(world, Variant::new())
    }

    /// An explorer that only explores continuations of `prefix`.
    pub fn with_prefix(world: World, prefix: Variant) -> Self {
        let mut variants = Variants::new();
        variants.add(prefix);
        Scheduler {
            world,
            properties: Vec::new(),
            variants,
            failures: Vec::new(),
        }
    }

    /// Add a property to check at the end of every run.
    pub fn add_property(&mut self, prop: Box<dyn Property>) -> &mut Self {
        self.properties.push(prop);
        self
    }

    /// Add a closure-based property.
    pub fn check<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(&World) -> Verdict + 'static,
    {
        self.add_property(Box::new(NamedProperty::new(name, f)))
    }

    /// Add the completion check run after every run.
    pub fn on_end<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&World) -> Verdict + 'static,
    {
        self.check("on_end", f)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn into_world(self) -> World {
        self.world
    }

    /// Variants still waiting in the worklist.
    pub fn pending(&self) -> usize {
        self.variants.len()
    }

    /// Failures recorded so far.
    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// Drain the worklist until it is empty, the iteration budget is spent,
    /// or the failure budget is reached.
    pub fn run(&mut self) -> SimResult<ExplorationReport> {
        let max_iterations = self.world.config().max_iterations;
        let max_failures = self.world.config().max_failures;
        let progress_every = self.world.config().progress_interval;
        info!(
            nodes = self.world.node_count(),
            unreliable = self.world.config().unreliable_nodes(),
            max_failed_nodes = self.world.config().max_failed_nodes,
            max_steps = self.world.config().max_steps,
            max_iterations,
            "exploration started"
        );

        let mut iterations = 0;
        let mut aborted = false;
        while iterations < max_iterations {
            let Some(variant) = self.variants.pop() else {
                break;
            };
            iterations += 1;
            self.world.global_stats_mut().iterations += 1;

            self.exec_variant(&variant, false)?;
            let variant = self.run_iteration(variant)?;
            if self.verify(&variant)? && self.failures.len() >= max_failures {
                warn!(failures = self.failures.len(), "failure budget reached, aborting");
                aborted = true;
                break;
            }

            if progress_every > 0 && iterations % progress_every == 0 {
                let stats = self.world.global_stats();
                info!(
                    iterations,
                    pending = self.variants.len(),
                    disconnects = stats.disconnects,
                    failures = stats.failures,
                    "exploration progress"
                );
            }
        }

        let exhausted = self.variants.is_empty() && !aborted;
        let stats = *self.world.global_stats();
        info!(%stats, exhausted, "exploration finished");
        Ok(ExplorationReport {
            iterations,
            failures: self.failures.clone(),
            exhausted,
            aborted,
            stats,
        })
    }

    /// Re-initialize the world and invoke `variant`'s choices in order.
    /// With `verbose`, every invoked event is dumped at warn level.
    pub fn exec_variant(&mut self, variant: &Variant, verbose: bool) -> SimResult<()> {
        debug!(%variant, "executing variant");
        self.world.init()?;
        for &index in variant {
            self.world.invoke(index)?;
            if verbose {
                if let Some(entry) = self.world.trace().last() {
                    warn!(step = entry.step, index, event = %entry.name, kind = %entry.kind, "replay");
                }
            }
        }
        Ok(())
    }

    /// Extend the already executed `variant` step by step: take the first
    /// enabled trigger, and push every other enabled trigger plus every
    /// disconnect the fault budget allows as a sibling variant.
    pub fn run_iteration(&mut self, mut variant: Variant) -> SimResult<Variant> {
        let max_steps = self.world.config().max_steps;
        loop {
            if variant.len() >= max_steps {
                debug!(%variant, "iteration exceeds the step budget");
                self.world.global_stats_mut().truncated += 1;
                break;
            }
            let frontier = self.world.available();
            let disconnect_allowed = self.world.disconnect_allowed();
            let mut next = None;
            for (index, entry) in frontier.iter().enumerate() {
                match entry.kind {
                    EventKind::Trigger if next.is_none() => next = Some(index),
                    EventKind::Trigger => self.variants.add_extent(&variant, index),
                    EventKind::Disconnect if disconnect_allowed => {
                        self.variants.add_extent(&variant, index)
                    }
                    EventKind::Disconnect => {}
                }
            }
            let Some(index) = next else {
                break;
            };
            variant.push(index);
            self.world.invoke(index)?;
        }
        Ok(variant)
    }

    /// Check every property; on the first violation, replay the run
    /// verbosely and record it. Returns whether a failure was recorded.
    fn verify(&mut self, variant: &Variant) -> SimResult<bool> {
        let violation = self
            .properties
            .iter()
            .find_map(|p| p.check(&self.world).err().map(|v| (p.name().to_string(), v)));
        let Some((property, violation)) = violation else {
            return Ok(false);
        };

        let original: Vec<String> = self.world.trace().iter().map(|e| e.name.clone()).collect();
        warn!(%property, %variant, %violation, "verification failed, replaying");
        self.exec_variant(variant, true)?;
        self.ensure_same_trace(&original)?;

        self.world.global_stats_mut().failures += 1;
        self.failures.push(Failure {
            property,
            variant: variant.clone(),
            message: violation.message().to_string(),
            trace: original,
        });
        Ok(true)
    }

    fn ensure_same_trace(&self, original: &[String]) -> SimResult<()> {
        let replayed = self.world.trace();
        for (step, expected) in original.iter().enumerate() {
            let actual = replayed.get(step).map(|e| e.name.as_str()).unwrap_or("<none>");
            if actual != expected {
                return Err(SimError::NonDeterministicReplay {
                    step,
                    expected: expected.clone(),
                    actual: actual.to_string(),
                });
            }
        }
        if replayed.len() > original.len() {
            return Err(SimError::NonDeterministicReplay {
                step: original.len(),
                expected: "<none>".to_string(),
                actual: replayed[original.len()].name.clone(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("properties", &self.properties.len())
            .field("pending", &self.variants.len())
            .field("failures", &self.failures.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::config::Config;
    use crate::node::{EchoService, MessageKind, NodeId, PingService, Service};
    use crate::verify::{ensure, Violation};
    use crate::world::ServiceContext;
    use tracing_test::traced_test;

    fn ping_world(config: Config) -> World {
        let nodes = config.nodes;
        let mut world = World::new(config).unwrap();
        world.create::<PingService>(0, 1).create::<EchoService>(1, nodes - 1);
        world
    }

    #[test]
    fn test_front_scheduler_respects_step_budget() {
        let mut world = ping_world(Config::default().with_nodes(3).with_max_steps(1));
        let steps = FrontScheduler::new(true).run(&mut world).unwrap();
        assert_eq!(steps, 1);
        assert_eq!(world.trace()[0].name, "Echo::Ping 0=>1");
    }

    #[test]
    fn test_front_scheduler_respects_fault_budget() {
        let mut world = ping_world(Config::default().with_nodes(3).with_max_failed_nodes(1));
        FrontScheduler::new(true).run(&mut world).unwrap();
        assert_eq!(world.stats().disconnects, 1);
        // The second disconnect stays pending.
        assert_eq!(world.emulator().pending_disconnects(), 1);
    }

    #[test]
    fn test_run_iteration_branches_on_every_alternative() {
        let world = ping_world(Config::default().with_nodes(2));
        let mut scheduler = Scheduler::new(world);
        let root = scheduler.variants.pop().unwrap();
        scheduler.exec_variant(&root, false).unwrap();

        // [Ping→1, disc1] → take Ping, branch disc1.
        // [Pong→0, disc1] → take Pong, branch disc1.
        // [disc1]         → no trigger, branch disc1, stop.
        let variant = scheduler.run_iteration(root).unwrap();
        assert_eq!(variant, Variant::from(vec![0, 0]));
        assert_eq!(scheduler.pending(), 3);
        assert_eq!(scheduler.variants.pop(), Some(Variant::from(vec![0, 0, 0])));
        assert_eq!(scheduler.variants.pop(), Some(Variant::from(vec![0, 1])));
        assert_eq!(scheduler.variants.pop(), Some(Variant::from(vec![1])));
    }

    #[test]
    fn test_no_disconnect_branches_without_budget() {
        let world = ping_world(Config::default().with_nodes(2).with_max_failed_nodes(0));
        let mut scheduler = Scheduler::new(world);
        let report = scheduler.run().unwrap();
        assert_eq!(report.iterations, 1);
        assert!(report.exhausted);
        assert_eq!(report.stats.disconnects, 0);
    }

    #[test]
    fn test_truncated_runs_are_counted() {
        let world = ping_world(Config::default().with_nodes(3).with_max_steps(2).with_max_failed_nodes(0));
        let mut scheduler = Scheduler::new(world);
        let report = scheduler.run().unwrap();
        assert!(report.exhausted);
        assert_eq!(report.stats.truncated, report.iterations);
    }

    #[test]
    fn test_iteration_budget_stops_exploration() {
        let world = ping_world(Config::default().with_nodes(3).with_max_iterations(2));
        let mut scheduler = Scheduler::new(world);
        let report = scheduler.run().unwrap();
        assert_eq!(report.iterations, 2);
        assert!(!report.exhausted);
        assert!(!report.aborted);
        assert!(scheduler.pending() > 0);
    }

    #[test]
    fn test_prefix_restricts_exploration() {
        let world = ping_world(Config::default().with_nodes(2));
        let mut scheduler = Scheduler::with_prefix(world, Variant::from(vec![1]));
        scheduler.on_end(|w| {
            ensure(w.trace()[0].name == "node disconnection: 1", || {
                format!("run escaped the prefix: {}", w.variant())
            })
        });
        let report = scheduler.run().unwrap();
        assert!(report.is_safe());
        assert_eq!(report.iterations, 1);
    }

    #[test]
    fn test_invalid_prefix_is_fatal() {
        let world = ping_world(Config::default().with_nodes(2));
        let mut scheduler = Scheduler::with_prefix(world, Variant::from(vec![5]));
        let err = scheduler.run().unwrap_err();
        assert!(matches!(err, SimError::InvalidVariantIndex { index: 5, .. }));
    }

    #[test]
    fn test_failure_budget_counts_distinct_runs() {
        let world = ping_world(Config::default().with_nodes(3).with_max_failures(2));
        let mut scheduler = Scheduler::new(world);
        scheduler.check("never crash", |w| {
            ensure(w.stats().disconnects == 0, || "a node crashed".to_string())
        });
        let report = scheduler.run().unwrap();
        assert_eq!(report.failure_count(), 2);
        assert!(report.aborted);
        assert_ne!(report.failures[0].variant, report.failures[1].variant);
        assert_eq!(report.stats.failures, 2);
    }

    #[traced_test]
    #[test]
    fn test_failure_is_replayed_in_logs() {
        let world = ping_world(Config::default().with_nodes(2));
        let mut scheduler = Scheduler::new(world);
        scheduler.check("always a pong", |w| {
            let ping = w.service::<PingService>(NodeId::new(0))?;
            ensure(!ping.received.is_empty(), || "no pong".to_string())
        });
        let report = scheduler.run().unwrap();

        assert_eq!(report.failure_count(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.variant, Variant::from(vec![1]));
        assert_eq!(failure.trace, vec!["node disconnection: 1".to_string()]);
        // The world is left in the replayed failing state.
        assert_eq!(scheduler.world().variant(), failure.variant);
        assert!(logs_contain("verification failed, replaying"));
        assert!(logs_contain("replay"));
    }

    #[traced_test]
    #[test]
    fn test_progress_is_reported() {
        let world = ping_world(Config::default().with_nodes(3).with_progress_interval(1));
        let mut scheduler = Scheduler::new(world);
        scheduler.run().unwrap();
        assert!(logs_contain("exploration progress"));
        assert!(logs_contain("exploration finished"));
    }

    #[cfg(feature = "serialize")]
    #[test]
    fn test_report_serializes_to_json() {
        let world = ping_world(Config::default().with_nodes(2));
        let report = Scheduler::new(world).run().unwrap();
        let json = report.to_json().unwrap();
        assert!(json.contains("\"exhausted\": true"));
        assert!(json.contains("\"iterations\""));
    }

    // ── Replay divergence ─────────────────────────────────────────────

    static FLAKY_STARTS: AtomicUsize = AtomicUsize::new(0);

    #[derive(Debug, Clone)]
    enum FlakyMessage {
        Go,
    }

    impl MessageKind for FlakyMessage {
        fn type_name(&self) -> &'static str {
            "Go"
        }
    }

    /// Picks its peer from state that survives re-initialization.
    #[derive(Debug, Default)]
    struct Flaky;

    impl Service for Flaky {
        const NAME: &'static str = "Flaky";
        type Message = FlakyMessage;
        type Indication = std::convert::Infallible;

        fn on_init(&mut self, cx: &mut ServiceContext<'_, Self>) -> SimResult<()> {
            if cx.node() == NodeId::new(0) {
                let start = FLAKY_STARTS.fetch_add(1, Ordering::SeqCst);
                cx.trigger_peer(NodeId::new(1 + start % 2), FlakyMessage::Go)?;
            }
            Ok(())
        }

        fn on_message(&mut self, _cx: &mut ServiceContext<'_, Self>, _msg: FlakyMessage) -> SimResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_divergent_replay_is_fatal() {
        let config = Config::default().with_nodes(3).with_max_failed_nodes(0);
        let mut world = World::new(config).unwrap();
        world.create::<Flaky>(0, 3);
        let mut scheduler = Scheduler::new(world);
        scheduler.check("always fails", |_| Err(Violation::new("forced")));

        let first = FLAKY_STARTS.load(Ordering::SeqCst);
        let (expected, actual) = if first % 2 == 0 { (1, 2) } else { (2, 1) };
        assert_eq!(
            scheduler.run().unwrap_err(),
            SimError::NonDeterministicReplay {
                step: 0,
                expected: format!("Flaky::Go 0=>{expected}"),
                actual: format!("Flaky::Go 0=>{actual}"),
            }
        );
    }
}
