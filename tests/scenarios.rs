//! The bundled protocols explored end to end.

use kairos::builder::{ScenarioBuilder, WorldBuilder};
use kairos::protocols::replob::{self, CarrySet, MsgId};
use kairos::protocols::{broadcast, register};
use kairos::protocols::{
    BestEffortBroadcast, BroadcastClient, RegisterClient, RegularRegister, Replob, ReplobClient,
};
use kairos::{ensure, Config, NodeId, Variant, Verdict, World};

fn replob_world(config: Config) -> World {
    let nodes = config.nodes;
    WorldBuilder::new()
        .config(config)
        .service::<ReplobClient>(0, 1)
        .service::<Replob>(0, nodes)
        .build()
        .unwrap()
}

fn applied() -> CarrySet {
    CarrySet::from([MsgId {
        origin: NodeId::new(0),
        seq: 0,
    }])
}

fn committed(world: &World, node: usize) -> Result<CarrySet, kairos::Violation> {
    Ok(world.service::<Replob>(NodeId::new(node))?.committed.clone())
}

#[test]
fn test_replob_without_failures_commits_everywhere() {
    let config = Config::default().with_max_failed_nodes(0);
    let report = ScenarioBuilder::new(replob_world(config))
        .assert("every node committed {m}", |w| {
            for node in 0..3 {
                let set = committed(w, node)?;
                ensure(set == applied(), || format!("node {node} committed {set:?}"))?;
            }
            Ok(())
        })
        .explore()
        .unwrap();
    assert!(report.exhausted);
    assert!(report.is_safe(), "{:?}", report.failures);
    assert_eq!(report.stats.disconnects, 0);
    assert_eq!(report.stats.truncated, 0);
}

#[test]
fn test_replob_survivors_agree_after_early_crash() {
    // Apply on node 0, then crash node 2 before anyone else voted.
    let check = |w: &World| -> Verdict {
        let n0 = committed(w, 0)?;
        let n1 = committed(w, 1)?;
        let n2 = committed(w, 2)?;
        ensure(!n0.is_empty(), || "node 0 committed nothing".into())?;
        ensure(n0 == n1, || format!("node 0 {n0:?} vs node 1 {n1:?}"))?;
        ensure(n2.is_empty() || n2.is_subset(&n0), || format!("node 2 {n2:?}"))?;
        ensure(!w.is_live(NodeId::new(2)), || "node 2 is still up".into())
    };
    let report = ScenarioBuilder::new(replob_world(Config::default()))
        .prefix(Variant::from(vec![0, 3]))
        .assert("survivors agree", check)
        .explore()
        .unwrap();
    assert!(report.exhausted);
    assert!(report.is_safe(), "{:?}", report.failures);
    assert!(report.iterations > 1);
}

#[test]
fn test_replob_default_budget_runs_to_exhaustion() {
    let config = Config::default()
        .with_nodes(3)
        .with_max_failed_nodes(1)
        .with_max_steps(50);
    let report = ScenarioBuilder::new(replob_world(config))
        .assert("node 0 committed", replob::must_commit)
        .explore()
        .unwrap();
    assert!(report.exhausted);
    assert!(!report.aborted);
    assert!(report.is_safe(), "{:?}", report.failures);
    assert!(report.stats.iterations > 0);
    assert_eq!(report.stats.truncated, 0);
}

#[test]
fn test_replob_crash_before_apply_splits_survivors() {
    // Node 2 crashes before node 0 applies: node 1 commits the empty
    // carry set it voted with, while node 0 commits the applied message.
    let mut world = replob_world(Config::default());
    world.init().unwrap();
    world.invoke(2).unwrap();
    while let Some(index) = world.available().iter().position(|a| a.kind.is_trigger()) {
        world.invoke(index).unwrap();
    }
    assert_eq!(world.variant(), Variant::from(vec![2, 0, 0, 0, 0, 0, 0]));
    assert_eq!(committed(&world, 0).unwrap(), applied());
    assert!(committed(&world, 1).unwrap().is_empty());
    assert!(replob::must_commit(&world).is_ok());
    assert!(replob::live_nodes_agree(&world).is_err());

    // The explorer reports that very run first.
    let report = ScenarioBuilder::new(replob_world(Config::default()))
        .prefix(Variant::from(vec![2]))
        .assert("live nodes agree", replob::live_nodes_agree)
        .explore()
        .unwrap();
    assert!(report.aborted);
    let failure = &report.failures[0];
    assert_eq!(failure.variant, Variant::from(vec![2, 0, 0, 0, 0, 0, 0]));
    assert!(failure.message.ends_with("node 1 committed {}"), "{}", failure.message);
}

#[test]
fn test_replob_two_nodes_commit_nothing_when_peer_crashes_first() {
    let config = Config::default().with_nodes(2).with_max_failures(100);
    let report = ScenarioBuilder::new(replob_world(config))
        .assert("node 0 committed", replob::must_commit)
        .explore()
        .unwrap();
    assert!(report.exhausted);
    assert_eq!(report.failure_count(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.variant, Variant::from(vec![1, 0]));
    assert_eq!(
        failure.trace,
        vec!["node disconnection: 1".to_string(), "Replob::Apply 0=>0".to_string()]
    );
}

#[test]
fn test_broadcast_reaches_every_live_node() {
    let report = ScenarioBuilder::new(
        WorldBuilder::new()
            .everywhere::<BroadcastClient>()
            .everywhere::<BestEffortBroadcast<u64>>()
            .build()
            .unwrap(),
    )
    .assert("every live node delivered", broadcast::every_live_node_delivered)
    .explore()
    .unwrap();
    assert!(report.exhausted);
    assert!(report.is_safe(), "{:?}", report.failures);
    assert!(report.stats.disconnects > 0);
}

#[test]
fn test_register_write_survives_replica_crash() {
    let nodes = 2;
    let world = WorldBuilder::new()
        .nodes(nodes)
        .service::<RegisterClient>(0, nodes + 1)
        .service::<RegularRegister<i64>>(1, nodes)
        .service::<BestEffortBroadcast<i64>>(1, nodes)
        .build()
        .unwrap();
    let report = ScenarioBuilder::new(world)
        .assert("write completed", register::write_completed)
        .explore()
        .unwrap();
    assert!(report.exhausted);
    assert!(report.is_safe(), "{:?}", report.failures);
    // Some run crashed the first replica and had to write twice.
    assert!(report.stats.disconnects > 0);
}

#[test]
fn test_register_rewrites_after_target_crash() {
    let nodes = 2;
    let mut world = WorldBuilder::new()
        .nodes(nodes)
        .service::<RegisterClient>(0, nodes + 1)
        .service::<RegularRegister<i64>>(1, nodes)
        .service::<BestEffortBroadcast<i64>>(1, nodes)
        .build()
        .unwrap();
    world.init().unwrap();

    // Crash replica 1 before it sees the write.
    let disc = world
        .available()
        .iter()
        .position(|a| world.emulator().name_of(a) == Some("node disconnection: 1"))
        .unwrap();
    world.invoke(disc).unwrap();
    while let Some(index) = world.available().iter().position(|a| a.kind.is_trigger()) {
        world.invoke(index).unwrap();
    }

    let client = world.service::<RegisterClient>(NodeId::new(0)).unwrap();
    assert!(client.written);
    assert_eq!(client.writes, 2);
    let replica = world.service::<RegularRegister<i64>>(NodeId::new(2)).unwrap();
    assert_eq!(replica.value, RegisterClient::VALUE);
}
