//! Replob: quorum commit of a carried message set.
//!
//! A node that applies a message votes for it with the set of nodes it
//! expects to hear from. Every node merges the carried messages of the
//! votes it sees, joins the vote once, and commits as soon as every node
//! of the (possibly shrunk) node set voted. A crash shrinks the node set
//! and counts as a vote of the survivor that observed it.

use std::collections::BTreeSet;

use crate::error::{SimError, SimResult};
use crate::node::{MessageKind, NodeId, Service};
use crate::verify::{ensure, Verdict};
use crate::world::{ServiceContext, World};

use super::NoMessage;

/// Identity of an applied message, unique per originating node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MsgId {
    pub origin: NodeId,
    pub seq: u32,
}

impl std::fmt::Display for MsgId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "m{}.{}", self.origin, self.seq)
    }
}

pub type CarrySet = BTreeSet<MsgId>;
pub type NodesSet = BTreeSet<NodeId>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    pub carry: CarrySet,
    pub src: NodeId,
    pub nodes: NodesSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplobMessage {
    Apply(MsgId),
    Vote(Vote),
    Commit(CarrySet),
}

impl MessageKind for ReplobMessage {
    fn type_name(&self) -> &'static str {
        match self {
            ReplobMessage::Apply(_) => "Apply",
            ReplobMessage::Vote(_) => "Vote",
            ReplobMessage::Commit(_) => "Commit",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum State {
    /// May still send its own vote.
    #[default]
    Initial,
    Voted,
    Completed,
}

/// Local transition produced by a handler and applied right after it.
enum Step {
    Vote(Vote),
    Commit(CarrySet),
}

// ── Replob ────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Replob {
    pub state: State,
    pub nodes: NodesSet,
    pub voted: NodesSet,
    pub carries: CarrySet,
    pub committed: CarrySet,
}

impl Replob {
    fn all_nodes(cx: &ServiceContext<'_, Self>) -> NodesSet {
        (0..cx.config().nodes).map(NodeId::new).collect()
    }

    fn advance(&mut self, cx: &mut ServiceContext<'_, Self>, first: Step) -> SimResult<()> {
        let mut next = Some(first);
        while let Some(step) = next.take() {
            next = match step {
                Step::Vote(vote) => self.vote(cx, vote)?,
                Step::Commit(carry) => {
                    self.commit(cx, carry)?;
                    None
                }
            };
        }
        Ok(())
    }

    fn vote(&mut self, cx: &mut ServiceContext<'_, Self>, vote: Vote) -> SimResult<Option<Step>> {
        if self.state == State::Completed {
            return Ok(None);
        }
        // Votes from nodes already excluded are stale.
        if !self.nodes.is_empty() && !cx.source().is_some_and(|src| self.nodes.contains(&src)) {
            return Ok(None);
        }

        self.carries.extend(vote.carry);
        if self.nodes.is_empty() {
            self.nodes = vote.nodes;
        } else if self.nodes != vote.nodes {
            self.state = State::Initial;
            self.nodes.retain(|n| vote.nodes.contains(n));
            self.voted.clear();
        }
        self.voted.insert(vote.src);
        self.voted.insert(cx.node());

        if self.voted == self.nodes {
            return Ok(Some(Step::Commit(self.carries.clone())));
        }
        if self.state == State::Initial {
            self.state = State::Voted;
            let own = Vote {
                carry: self.carries.clone(),
                src: cx.node(),
                nodes: self.nodes.clone(),
            };
            cx.trigger_all_except_self::<Self>(ReplobMessage::Vote(own))?;
        }
        Ok(None)
    }

    fn commit(&mut self, cx: &mut ServiceContext<'_, Self>, carry: CarrySet) -> SimResult<()> {
        if self.state == State::Completed {
            return Ok(());
        }
        self.state = State::Completed;
        self.carries = carry;
        cx.trigger_all_except_self::<Self>(ReplobMessage::Commit(self.carries.clone()))?;
        self.complete(cx.node())
    }

    fn complete(&mut self, node: NodeId) -> SimResult<()> {
        if !self.committed.is_empty() && self.committed != self.carries {
            return Err(SimError::Protocol(format!(
                "node {node} committed twice: {:?} then {:?}",
                self.committed, self.carries
            )));
        }
        self.committed = self.carries.clone();
        Ok(())
    }
}

impl Service for Replob {
    const NAME: &'static str = "Replob";
    type Message = ReplobMessage;
    type Indication = std::convert::Infallible;

    fn on_disconnect(&mut self, cx: &mut ServiceContext<'_, Self>) -> SimResult<()> {
        let failed = cx.source();
        let mut nodes = Self::all_nodes(cx);
        nodes.retain(|&n| Some(n) != failed);
        let vote = Vote {
            carry: self.carries.clone(),
            src: cx.node(),
            nodes,
        };
        self.advance(cx, Step::Vote(vote))
    }

    fn on_message(&mut self, cx: &mut ServiceContext<'_, Self>, msg: ReplobMessage) -> SimResult<()> {
        match msg {
            ReplobMessage::Apply(id) => {
                let vote = Vote {
                    carry: CarrySet::from([id]),
                    src: cx.node(),
                    nodes: Self::all_nodes(cx),
                };
                self.advance(cx, Step::Vote(vote))
            }
            ReplobMessage::Vote(vote) => self.advance(cx, Step::Vote(vote)),
            ReplobMessage::Commit(carry) => self.advance(cx, Step::Commit(carry)),
        }
    }
}

// ── ReplobClient ──────────────────────────────────────────────────────

/// Applies one message on its own node at init and records crashed peers.
#[derive(Debug, Default)]
pub struct ReplobClient {
    pub applied: Option<MsgId>,
    pub disconnected: NodesSet,
}

impl Service for ReplobClient {
    const NAME: &'static str = "ReplobClient";
    type Message = NoMessage;
    type Indication = std::convert::Infallible;

    fn on_init(&mut self, cx: &mut ServiceContext<'_, Self>) -> SimResult<()> {
        let id = MsgId {
            origin: cx.node(),
            seq: 0,
        };
        self.applied = Some(id);
        cx.trigger_local::<Replob>(ReplobMessage::Apply(id))?;
        Ok(())
    }

    fn on_disconnect(&mut self, cx: &mut ServiceContext<'_, Self>) -> SimResult<()> {
        if let Some(failed) = cx.source() {
            self.disconnected.insert(failed);
        }
        Ok(())
    }

    fn on_message(&mut self, _cx: &mut ServiceContext<'_, Self>, msg: NoMessage) -> SimResult<()> {
        match msg {}
    }
}

// ── Checks ────────────────────────────────────────────────────────────

/// Node 0 committed something.
pub fn must_commit(world: &World) -> Verdict {
    let replob = world.service::<Replob>(NodeId::new(0))?;
    ensure(!replob.committed.is_empty(), || "node 0 must commit".to_string())
}

/// Every live node committed the same set.
pub fn live_nodes_agree(world: &World) -> Verdict {
    let mut reference: Option<(NodeId, &CarrySet)> = None;
    for (node, state) in world.nodes().iter() {
        if !state.is_on() || !state.has_process::<Replob>() {
            continue;
        }
        let committed = &world.service::<Replob>(node)?.committed;
        match reference {
            None => reference = Some((node, committed)),
            Some((first, expected)) => ensure(committed == expected, || {
                format!("node {first} committed {expected:?} but node {node} committed {committed:?}")
            })?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn world(max_failed_nodes: usize) -> World {
        let config = Config::default().with_max_failed_nodes(max_failed_nodes);
        let mut world = World::new(config).unwrap();
        world.create::<ReplobClient>(0, 1).create::<Replob>(0, 3);
        world
    }

    fn committed(world: &World, node: usize) -> CarrySet {
        world.service::<Replob>(NodeId::new(node)).unwrap().committed.clone()
    }

    #[test]
    fn test_first_frontier_is_apply_then_disconnects() {
        let mut w = world(1);
        w.init().unwrap();
        let names: Vec<String> = w
            .available()
            .iter()
            .map(|a| w.emulator().name_of(a).unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "Replob::Apply 0=>0",
                "node disconnection: 1",
                "node disconnection: 2",
            ]
        );
    }

    #[test]
    fn test_leftmost_run_commits_everywhere() {
        let mut w = world(0);
        w.init().unwrap();
        while let Some(index) = w.available().iter().position(|a| a.kind.is_trigger()) {
            w.invoke(index).unwrap();
        }
        let m = CarrySet::from([MsgId {
            origin: NodeId::new(0),
            seq: 0,
        }]);
        for node in 0..3 {
            assert_eq!(committed(&w, node), m);
            assert_eq!(w.service::<Replob>(NodeId::new(node)).unwrap().state, State::Completed);
        }
        assert!(must_commit(&w).is_ok());
        assert!(live_nodes_agree(&w).is_ok());
    }

    #[test]
    fn test_disconnect_shrinks_node_set() {
        let mut w = world(1);
        w.init().unwrap();
        // Apply on node 0, then crash node 2.
        w.invoke(0).unwrap();
        w.invoke(3).unwrap();

        let r1 = w.service::<Replob>(NodeId::new(1)).unwrap();
        assert_eq!(r1.nodes, NodesSet::from([NodeId::new(0), NodeId::new(1)]));
        let client = w.service::<ReplobClient>(NodeId::new(0)).unwrap();
        assert_eq!(client.disconnected, NodesSet::from([NodeId::new(2)]));
    }

    #[test]
    fn test_agreement_check_reports_divergence() {
        let mut w = world(0);
        w.init().unwrap();
        // Nothing ran: every committed set is empty, so nodes agree but
        // node 0 has not committed.
        assert!(live_nodes_agree(&w).is_ok());
        assert_eq!(must_commit(&w).unwrap_err().message(), "node 0 must commit");
    }
}
