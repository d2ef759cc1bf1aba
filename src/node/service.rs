//! The participant contract: what a protocol implementation provides so the
//! engine can host it on a simulated node.

use std::any::Any;

use crate::error::SimResult;
use crate::world::ServiceContext;

// ── MessageKind ───────────────────────────────────────────────────────

/// Names the variant of a message enum.
///
/// Used to build event names such as `Replob::Vote 0=>1`, which is what
/// replays and frontier dumps show.
pub trait MessageKind {
    /// Short, stable name of this message's variant.
    fn type_name(&self) -> &'static str;
}

// ── Service ───────────────────────────────────────────────────────────

/// A per-node protocol state machine, addressed by its type.
///
/// A node hosts at most one instance of each `Service` type. The instance
/// is rebuilt from `Default` at the start of every run, receives
/// [`on_init`](Service::on_init) once, [`on_message`](Service::on_message)
/// for every delivered trigger, and [`on_disconnect`](Service::on_disconnect)
/// whenever a peer crashes.
///
/// Handlers run to completion synchronously and must be deterministic:
/// everything they do to the outside world goes through the
/// [`ServiceContext`].
///
/// # Example
///
/// ```rust
/// use kairos::{MessageKind, NodeId, Service, ServiceContext, SimResult};
///
/// #[derive(Debug, Clone)]
/// enum PingMessage { Ping, Pong }
///
/// impl MessageKind for PingMessage {
///     fn type_name(&self) -> &'static str {
///         match self {
///             PingMessage::Ping => "Ping",
///             PingMessage::Pong => "Pong",
///         }
///     }
/// }
///
/// #[derive(Default)]
/// struct Pinger { pongs: usize }
///
/// impl Service for Pinger {
///     const NAME: &'static str = "Pinger";
///     type Message = PingMessage;
///     type Indication = std::convert::Infallible;
///
///     fn on_init(&mut self, cx: &mut ServiceContext<'_, Self>) -> SimResult<()> {
///         if cx.node() == NodeId::new(0) {
///             cx.trigger_all_except_self::<Self>(PingMessage::Ping)?;
///         }
///         Ok(())
///     }
///
///     fn on_message(&mut self, cx: &mut ServiceContext<'_, Self>, msg: PingMessage) -> SimResult<()> {
///         match msg {
///             PingMessage::Ping => {
///                 if let Some(src) = cx.source() {
///                     cx.trigger_peer(src, PingMessage::Pong)?;
///                 }
///             }
///             PingMessage::Pong => self.pongs += 1,
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Service: Default + 'static {
    /// Display name used in event names and errors.
    const NAME: &'static str;

    /// Messages other participants may trigger on this service.
    type Message: MessageKind + Clone + std::fmt::Debug + 'static;

    /// Local notifications this service hands to whatever is bound to it.
    /// Use [`std::convert::Infallible`] when there are none.
    type Indication: 'static;

    /// Called once per run when the node starts.
    fn on_init(&mut self, _cx: &mut ServiceContext<'_, Self>) -> SimResult<()> {
        Ok(())
    }

    /// Called when a peer crashed; `cx.source()` names the failed node.
    fn on_disconnect(&mut self, _cx: &mut ServiceContext<'_, Self>) -> SimResult<()> {
        Ok(())
    }

    /// Called for every message delivered to this instance.
    fn on_message(
        &mut self,
        cx: &mut ServiceContext<'_, Self>,
        msg: Self::Message,
    ) -> SimResult<()>;
}

/// Receives the indications of a lower service `L` on the same node.
///
/// Wired with [`ServiceContext::bind_to`] (from the upper side) or
/// [`ServiceContext::attach_to`] (from the lower side). Indications are
/// forwarded after the lower handler returns, under the same context.
pub trait Attach<L: Service>: Service {
    /// Handle one indication emitted by `L`.
    fn on_indication(
        &mut self,
        cx: &mut ServiceContext<'_, Self>,
        indication: L::Indication,
    ) -> SimResult<()>;
}

// ── Type erasure ──────────────────────────────────────────────────────

/// Object-safe view of a hosted service.
pub(crate) trait AnyService {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<S: Service> AnyService for S {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
