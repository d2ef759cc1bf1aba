//! Nodes, the services they host, and the per-run trace.
//!
//! A node is a slot in the world that hosts at most one instance of each
//! [`Service`] type. Services never reference each other directly: all
//! interaction goes through triggers queued by the world, or through
//! indications forwarded to a bound upper service on the same node.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`id`] | [`NodeId`] newtype |
//! | [`service`] | [`Service`], [`MessageKind`], [`Attach`] |
//! | [`process`] | [`Process`]: a hosted instance plus its queue |
//! | [`registry`] | [`Node`], [`Nodes`] |
//! | [`trace`] | [`TraceEntry`] struct |
//! | [`builtin`] | [`PingService`], [`EchoService`] |

pub mod builtin;
pub mod id;
pub mod process;
pub mod registry;
pub mod service;
pub mod trace;

// Flat re-exports so external callers can use `kairos::node::NodeId` etc.
pub use builtin::{EchoService, PingService};
pub use id::NodeId;
pub use process::Process;
pub use registry::{Node, Nodes};
pub use service::{Attach, MessageKind, Service};
pub use trace::TraceEntry;
