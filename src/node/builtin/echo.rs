//! `EchoService`: answers every ping with a pong to the sender.

use std::convert::Infallible;

use crate::error::SimResult;
use crate::world::ServiceContext;

use crate::node::builtin::ping::{PingMessage, PingService};
use crate::node::service::{MessageKind, Service};

/// Messages accepted by [`EchoService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EchoMessage {
    /// Request a `Pong` carrying the same sequence number.
    Ping(u32),
}

impl MessageKind for EchoMessage {
    fn type_name(&self) -> &'static str {
        match self {
            EchoMessage::Ping(_) => "Ping",
        }
    }
}

/// Replies to every `Ping(n)` with `PingService::Pong(n)` on the sending
/// node. `echo_count` tracks how many pings were answered.
#[derive(Debug, Default)]
pub struct EchoService {
    pub echo_count: u64,
}

impl Service for EchoService {
    const NAME: &'static str = "Echo";
    type Message = EchoMessage;
    type Indication = Infallible;

    fn on_message(&mut self, cx: &mut ServiceContext<'_, Self>, msg: EchoMessage) -> SimResult<()> {
        let EchoMessage::Ping(seq) = msg;
        self.echo_count += 1;
        if let Some(src) = cx.source() {
            cx.trigger::<PingService>(src, PingMessage::Pong(seq))?;
        }
        Ok(())
    }
}
