//! Built-in services: PingService and EchoService.
//!
//! These are small reference participants used for testing and
//! demonstration. Real protocols (broadcast, register, replob) live in
//! `src/protocols/`.

pub mod echo;
pub mod ping;

pub use echo::{EchoMessage, EchoService};
pub use ping::{PingMessage, PingService};
