//! A 1-writer/N-reader regular register over best-effort broadcast, and a
//! client that survives the crash of the register it writes to.

use std::convert::Infallible;

use tracing::warn;

use crate::error::SimResult;
use crate::node::{Attach, MessageKind, NodeId, Service};
use crate::verify::{ensure, Verdict};
use crate::world::{ServiceContext, World};

use super::broadcast::{BestEffortBroadcast, BroadcastMessage};
use super::MsgSrc;

// ── RegularRegister ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterMessage<T> {
    /// Write a new value through this replica.
    Write(T),
    /// A replica stored the written value.
    Ack,
}

impl<T> MessageKind for RegisterMessage<T> {
    fn type_name(&self) -> &'static str {
        match self {
            RegisterMessage::Write(_) => "Write",
            RegisterMessage::Ack => "Ack",
        }
    }
}

/// Indicated once a write was acknowledged by, or outlived, every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReturn;

/// One replica of the register.
///
/// A write is broadcast to every replica; each stores the value and acks
/// to the writer. The writer completes once acks plus observed crashes
/// reach the configured node count.
#[derive(Debug, Default)]
pub struct RegularRegister<T> {
    pub value: T,
    pub acks: usize,
}

impl<T> RegularRegister<T>
where
    T: Default + Clone + std::fmt::Debug + 'static,
{
    fn count(&mut self, cx: &mut ServiceContext<'_, Self>) {
        self.acks += 1;
        if self.acks == cx.config().nodes {
            self.acks = 0;
            cx.indicate(WriteReturn);
        }
    }
}

impl<T> Service for RegularRegister<T>
where
    T: Default + Clone + std::fmt::Debug + 'static,
{
    const NAME: &'static str = "RegularRegister";
    type Message = RegisterMessage<T>;
    type Indication = WriteReturn;

    fn on_init(&mut self, cx: &mut ServiceContext<'_, Self>) -> SimResult<()> {
        cx.bind_to::<BestEffortBroadcast<T>>()
    }

    fn on_disconnect(&mut self, cx: &mut ServiceContext<'_, Self>) -> SimResult<()> {
        self.count(cx);
        Ok(())
    }

    fn on_message(&mut self, cx: &mut ServiceContext<'_, Self>, msg: RegisterMessage<T>) -> SimResult<()> {
        match msg {
            RegisterMessage::Write(value) => {
                cx.trigger_local::<BestEffortBroadcast<T>>(BroadcastMessage::Broadcast(value))?;
            }
            RegisterMessage::Ack => self.count(cx),
        }
        Ok(())
    }
}

impl<T> Attach<BestEffortBroadcast<T>> for RegularRegister<T>
where
    T: Default + Clone + std::fmt::Debug + 'static,
{
    fn on_indication(&mut self, cx: &mut ServiceContext<'_, Self>, copy: MsgSrc<T>) -> SimResult<()> {
        self.value = copy.msg;
        cx.trigger_peer(copy.src, RegisterMessage::Ack)?;
        Ok(())
    }
}

// ── RegisterClient ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// The write issued from node 0 completed.
    Written,
}

impl MessageKind for ClientMessage {
    fn type_name(&self) -> &'static str {
        match self {
            ClientMessage::Written => "Written",
        }
    }
}

/// Writes `1` from node 0 through the first live replica, and writes
/// again through the next one if that replica crashes first.
///
/// Instances on the replica nodes relay `WriteReturn` back to node 0.
#[derive(Debug, Default)]
pub struct RegisterClient {
    pub written: bool,
    pub writes: usize,
    target: Option<NodeId>,
}

impl RegisterClient {
    /// Value every write stores.
    pub const VALUE: i64 = 1;

    fn write(&mut self, cx: &mut ServiceContext<'_, Self>) -> SimResult<()> {
        self.writes += 1;
        self.target = (0..cx.node_count())
            .map(NodeId::new)
            .find(|&n| cx.is_live_at::<RegularRegister<i64>>(n));
        let queued = cx.trigger_any::<RegularRegister<i64>>(RegisterMessage::Write(Self::VALUE), Some(1))?;
        if queued != 1 {
            warn!(node = %cx.node(), "no live register to write to");
        }
        Ok(())
    }
}

impl Service for RegisterClient {
    const NAME: &'static str = "RegisterClient";
    type Message = ClientMessage;
    type Indication = Infallible;

    fn on_init(&mut self, cx: &mut ServiceContext<'_, Self>) -> SimResult<()> {
        if cx.node() == NodeId::new(0) {
            self.write(cx)
        } else {
            cx.bind_to::<RegularRegister<i64>>()
        }
    }

    fn on_disconnect(&mut self, cx: &mut ServiceContext<'_, Self>) -> SimResult<()> {
        if cx.node() != NodeId::new(0) || self.written || cx.source() != self.target {
            return Ok(());
        }
        self.write(cx)
    }

    fn on_message(&mut self, _cx: &mut ServiceContext<'_, Self>, msg: ClientMessage) -> SimResult<()> {
        match msg {
            ClientMessage::Written => self.written = true,
        }
        Ok(())
    }
}

impl Attach<RegularRegister<i64>> for RegisterClient {
    fn on_indication(&mut self, cx: &mut ServiceContext<'_, Self>, _done: WriteReturn) -> SimResult<()> {
        cx.trigger::<RegisterClient>(NodeId::new(0), ClientMessage::Written)?;
        Ok(())
    }
}

/// The client on node 0 saw its write complete.
pub fn write_completed(world: &World) -> Verdict {
    let client = world.service::<RegisterClient>(NodeId::new(0))?;
    ensure(client.written, || {
        format!("write not acknowledged after {} attempt(s)", client.writes)
    })
}
