//! `PingService`: pings every echo peer from node 0 and records the pongs.

use std::convert::Infallible;

use crate::error::SimResult;
use crate::world::ServiceContext;

use crate::node::builtin::echo::{EchoMessage, EchoService};
use crate::node::id::NodeId;
use crate::node::service::{MessageKind, Service};

/// Messages accepted by [`PingService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PingMessage {
    /// Answer to `Ping(n)`.
    Pong(u32),
}

impl MessageKind for PingMessage {
    fn type_name(&self) -> &'static str {
        match self {
            PingMessage::Pong(_) => "Pong",
        }
    }
}

/// A sink that records every pong it receives.
///
/// On node 0 it sends `rounds` numbered pings to every live
/// [`EchoService`] at init. Other instances stay passive. Crashed peers
/// are recorded in `disconnected`, which makes the service handy for
/// checking fault-injection behavior.
#[derive(Debug)]
pub struct PingService {
    pub rounds: u32,
    /// Every pong received, in delivery order: `(from, seq)`.
    pub received: Vec<(NodeId, u32)>,
    pub disconnected: Vec<NodeId>,
}

impl Default for PingService {
    fn default() -> Self {
        PingService {
            rounds: 1,
            received: Vec::new(),
            disconnected: Vec::new(),
        }
    }
}

impl Service for PingService {
    const NAME: &'static str = "Ping";
    type Message = PingMessage;
    type Indication = Infallible;

    fn on_init(&mut self, cx: &mut ServiceContext<'_, Self>) -> SimResult<()> {
        if cx.node() == NodeId::new(0) {
            for seq in 0..self.rounds {
                cx.trigger_all_except_self::<EchoService>(EchoMessage::Ping(seq))?;
            }
        }
        Ok(())
    }

    fn on_disconnect(&mut self, cx: &mut ServiceContext<'_, Self>) -> SimResult<()> {
        if let Some(failed) = cx.source() {
            self.disconnected.push(failed);
        }
        Ok(())
    }

    fn on_message(&mut self, cx: &mut ServiceContext<'_, Self>, msg: PingMessage) -> SimResult<()> {
        let PingMessage::Pong(seq) = msg;
        if let Some(src) = cx.source() {
            self.received.push((src, seq));
        }
        Ok(())
    }
}
