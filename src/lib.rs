//! # Kairos: Deterministic Interleaving Explorer
//!
//! A simulation kernel for checking distributed protocols against every
//! order in which their messages and crash failures can happen. No async,
//! no threads, no clocks: participants are plain state machines, and the
//! only nondeterminism is which enabled event runs next.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────┐
//! │        Scheduler          │ ← depth-first walk over variants
//! │  ┌─────────────────────┐  │
//! │  │       World         │  │ ← config, stats, context, trace
//! │  │  ┌───────────────┐  │  │
//! │  │  │    Nodes      │  │  │ ← services addressed by type
//! │  │  └───────────────┘  │  │
//! │  │  ┌───────────────┐  │  │
//! │  │  │   Emulator    │  │  │ ← FIFO queues + pending crashes
//! │  │  └───────────────┘  │  │
//! │  └─────────────────────┘  │
//! └───────────────────────────┘
//! ```
//!
//! A run starts from [`World::init`]; each step picks one entry of the
//! frontier ([`World::available`]) and invokes it. A run is fully described
//! by its [`Variant`], the list of chosen frontier indices, so any run can
//! be replayed bit-for-bit from a fresh world.

pub mod builder;
pub mod config;
pub mod context;
pub mod emulator;
pub mod error;
pub mod event;
pub mod node;
pub mod protocols;
pub mod queue;
pub mod scheduler;
pub mod stats;
pub mod variant;
pub mod verify;
pub mod world;

// Re-exports for convenience.
pub use config::Config;
pub use context::{Context, ContextCell, ContextGuard};
pub use emulator::{Available, Emulator, Slot};
pub use error::{SimError, SimResult};
pub use event::{Action, Event, EventId, EventIdGen, EventKind};
pub use node::{
    Attach, EchoService, MessageKind, Node, NodeId, Nodes, PingService, Process, Service,
    TraceEntry,
};
pub use queue::{EventQueue, QueueId, QueueRegistry};
pub use scheduler::{ExplorationReport, Failure, FrontScheduler, Scheduler};
pub use stats::{GlobalStats, Stats};
pub use variant::{Variant, Variants};
pub use verify::{ensure, NamedProperty, Property, Verdict, Violation};
pub use world::{ServiceContext, World};
