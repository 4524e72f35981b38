//! peerdir registry daemon library
//!
//! Exposes the reactor and CLI so integration tests can bind a real
//! listener on an ephemeral port and drive it over TCP.

pub mod cli;
pub mod reactor;

pub use cli::Cli;
pub use reactor::Reactor;
