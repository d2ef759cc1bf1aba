//! Example participants built on the service contract.
//!
//! These protocols are what the engine was built to check:
//!
//! | Module | Services |
//! |---|---|
//! | [`broadcast`] | [`BestEffortBroadcast`], [`BroadcastClient`] |
//! | [`register`] | [`RegularRegister`], [`RegisterClient`] |
//! | [`replob`] | [`Replob`], [`ReplobClient`] |
//!
//! Each module also exports the end-of-run checks used by the bundled
//! scenarios.

pub mod broadcast;
pub mod register;
pub mod replob;

pub use broadcast::{BestEffortBroadcast, BroadcastClient, BroadcastMessage};
pub use register::{RegisterClient, RegisterMessage, RegularRegister, WriteReturn};
pub use replob::{MsgId, Replob, ReplobClient, ReplobMessage};

use crate::node::NodeId;

/// A payload tagged with the node that originated it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgSrc<T> {
    pub msg: T,
    pub src: NodeId,
}

impl<T> MsgSrc<T> {
    pub fn new(msg: T, src: NodeId) -> Self {
        MsgSrc { msg, src }
    }
}

/// Message type of services nobody sends messages to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoMessage {}

impl crate::node::MessageKind for NoMessage {
    fn type_name(&self) -> &'static str {
        match *self {}
    }
}
