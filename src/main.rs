//! Kairos exploration binary.
//!
//! Runs one of the bundled protocol scenarios through the exhaustive
//! explorer and reports every failing schedule.
//!
//! # Usage
//!
//! ```bash
//! # Quorum commit on 3 nodes with at most one crash
//! kairos replob --nodes 3 --max-failed-nodes 1
//!
//! # Only explore continuations of a known prefix
//! kairos replob --prefix "0 3"
//!
//! # Dump every invoked event
//! RUST_LOG=kairos=trace kairos broadcast
//! ```

use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use kairos::builder::{ScenarioBuilder, WorldBuilder};
use kairos::protocols::{broadcast, register, replob};
use kairos::protocols::{
    BestEffortBroadcast, BroadcastClient, RegisterClient, RegularRegister, Replob, ReplobClient,
};
use kairos::{Config, ExplorationReport, SimResult, Variant};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Scenario {
    /// Best-effort broadcast from node 0 to every node
    Broadcast,
    /// Regular register written from node 0 through a crashable replica
    Register,
    /// Quorum commit of one applied message
    Replob,
}

/// Deterministic interleaving explorer for distributed protocols
#[derive(Parser, Debug)]
#[command(name = "kairos")]
#[command(about = "Explore every message interleaving of a protocol scenario")]
#[command(version)]
struct Args {
    /// Scenario to explore
    #[arg(value_enum)]
    scenario: Scenario,

    /// Number of simulated nodes
    #[arg(long, default_value = "3")]
    nodes: usize,

    /// Crash failures allowed per run
    #[arg(long, default_value = "1")]
    max_failed_nodes: usize,

    /// Events per run before the run is cut short
    #[arg(long, default_value = "50")]
    max_steps: usize,

    /// Runs explored before giving up
    #[arg(long, default_value = "100000")]
    max_iterations: usize,

    /// Failures recorded before aborting
    #[arg(long, default_value = "1")]
    max_failures: usize,

    /// Iterations between progress reports (0 disables them)
    #[arg(long, default_value = "10000")]
    progress_interval: usize,

    /// First node that may crash
    #[arg(long, default_value = "1")]
    min_unreliable_node: usize,

    /// Explore only continuations of this schedule, e.g. "0 3"
    #[arg(long)]
    prefix: Option<Variant>,

    /// Print the exploration report as JSON (needs the `serialize` feature)
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn config(&self) -> Config {
        Config::default()
            .with_nodes(self.nodes)
            .with_max_failed_nodes(self.max_failed_nodes)
            .with_max_steps(self.max_steps)
            .with_max_iterations(self.max_iterations)
            .with_max_failures(self.max_failures)
            .with_progress_interval(self.progress_interval)
            .with_min_unreliable_node(self.min_unreliable_node)
    }
}

fn scenario(args: &Args) -> SimResult<ScenarioBuilder> {
    let nodes = args.nodes;
    let base = WorldBuilder::new().config(args.config());
    let scenario = match args.scenario {
        Scenario::Broadcast => {
            let world = base
                .service::<BroadcastClient>(0, nodes)
                .service::<BestEffortBroadcast<u64>>(0, nodes)
                .build()?;
            ScenarioBuilder::new(world)
                .assert("every live node delivered", broadcast::every_live_node_delivered)
        }
        Scenario::Register => {
            let world = base
                .service::<RegisterClient>(0, nodes + 1)
                .service::<RegularRegister<i64>>(1, nodes)
                .service::<BestEffortBroadcast<i64>>(1, nodes)
                .build()?;
            ScenarioBuilder::new(world).assert("write completed", register::write_completed)
        }
        Scenario::Replob => {
            let world = base
                .service::<ReplobClient>(0, 1)
                .service::<Replob>(0, nodes)
                .build()?;
            ScenarioBuilder::new(world)
                .assert("node 0 committed", replob::must_commit)
                .assert("live nodes agree", replob::live_nodes_agree)
        }
    };
    Ok(match &args.prefix {
        Some(prefix) => scenario.prefix(prefix.clone()),
        None => scenario,
    })
}

#[cfg(feature = "serialize")]
fn print_json(report: &ExplorationReport) {
    match report.to_json() {
        Ok(json) => println!("{json}"),
        Err(err) => tracing::error!(%err, "cannot encode the report"),
    }
}

#[cfg(not(feature = "serialize"))]
fn print_json(_report: &ExplorationReport) {
    tracing::warn!("--json requires the `serialize` feature");
}

fn main() -> ExitCode {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!(scenario = ?args.scenario, "kairos starting");

    let report = match scenario(&args).and_then(ScenarioBuilder::explore) {
        Ok(report) => report,
        Err(err) => {
            tracing::error!(%err, "exploration aborted");
            return ExitCode::from(2);
        }
    };

    for failure in &report.failures {
        tracing::warn!(
            property = %failure.property,
            variant = %failure.variant,
            message = %failure.message,
            "failing schedule"
        );
        for (step, name) in failure.trace.iter().enumerate() {
            tracing::warn!(step, event = %name, "  replay");
        }
    }
    tracing::info!(
        iterations = report.iterations,
        exhausted = report.exhausted,
        failures = report.failure_count(),
        "{}",
        report.stats
    );

    if args.json {
        print_json(&report);
    }

    if report.is_safe() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
