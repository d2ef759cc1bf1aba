//! Best-effort broadcast and a client that exercises it.

use std::convert::Infallible;

use crate::error::SimResult;
use crate::node::{Attach, MessageKind, NodeId, Service};
use crate::verify::{ensure, Verdict};
use crate::world::{ServiceContext, World};

use super::{MsgSrc, NoMessage};

// ── BestEffortBroadcast ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastMessage<T> {
    /// Send the payload to every live instance, this one included.
    Broadcast(T),
    /// One copy arriving at a receiver.
    Deliver(MsgSrc<T>),
}

impl<T> MessageKind for BroadcastMessage<T> {
    fn type_name(&self) -> &'static str {
        match self {
            BroadcastMessage::Broadcast(_) => "Broadcast",
            BroadcastMessage::Deliver(_) => "Deliver",
        }
    }
}

/// Sends one copy of a payload to every live node; no retransmission, so a
/// crashed sender may reach only some of them.
///
/// Every delivered copy is recorded and, when an upper service is bound,
/// indicated to it.
#[derive(Debug)]
pub struct BestEffortBroadcast<T> {
    pub delivered: Vec<MsgSrc<T>>,
}

impl<T> Default for BestEffortBroadcast<T> {
    fn default() -> Self {
        BestEffortBroadcast {
            delivered: Vec::new(),
        }
    }
}

impl<T> Service for BestEffortBroadcast<T>
where
    T: Clone + std::fmt::Debug + 'static,
{
    const NAME: &'static str = "BestEffortBroadcast";
    type Message = BroadcastMessage<T>;
    type Indication = MsgSrc<T>;

    fn on_message(
        &mut self,
        cx: &mut ServiceContext<'_, Self>,
        msg: BroadcastMessage<T>,
    ) -> SimResult<()> {
        match msg {
            BroadcastMessage::Broadcast(payload) => {
                let origin = cx.node();
                cx.trigger_all::<Self>(BroadcastMessage::Deliver(MsgSrc::new(payload, origin)))?;
            }
            BroadcastMessage::Deliver(copy) => {
                self.delivered.push(copy.clone());
                if cx.has_listener() {
                    cx.indicate(copy);
                }
            }
        }
        Ok(())
    }
}

// ── BroadcastClient ───────────────────────────────────────────────────

/// Broadcasts `1` from node 0 at init and records what its node delivered.
#[derive(Debug, Default)]
pub struct BroadcastClient {
    pub delivered: Vec<MsgSrc<u64>>,
}

impl Service for BroadcastClient {
    const NAME: &'static str = "BroadcastClient";
    type Message = NoMessage;
    type Indication = Infallible;

    fn on_init(&mut self, cx: &mut ServiceContext<'_, Self>) -> SimResult<()> {
        cx.bind_to::<BestEffortBroadcast<u64>>()?;
        if cx.node() == NodeId::new(0) {
            cx.trigger_local::<BestEffortBroadcast<u64>>(BroadcastMessage::Broadcast(1))?;
        }
        Ok(())
    }

    fn on_message(&mut self, _cx: &mut ServiceContext<'_, Self>, msg: NoMessage) -> SimResult<()> {
        match msg {}
    }
}

impl Attach<BestEffortBroadcast<u64>> for BroadcastClient {
    fn on_indication(
        &mut self,
        _cx: &mut ServiceContext<'_, Self>,
        indication: MsgSrc<u64>,
    ) -> SimResult<()> {
        self.delivered.push(indication);
        Ok(())
    }
}

/// Every live node delivered node 0's payload exactly once.
pub fn every_live_node_delivered(world: &World) -> Verdict {
    for (node, state) in world.nodes().iter() {
        if !state.is_on() {
            continue;
        }
        let client = world.service::<BroadcastClient>(node)?;
        let expected = [MsgSrc::new(1, NodeId::new(0))];
        ensure(client.delivered == expected, || {
            format!("node {node} delivered {:?}", client.delivered)
        })?;
    }
    Ok(())
}
