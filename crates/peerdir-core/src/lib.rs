//! peerdir core protocol implementation
//!
//! Sans-I/O building blocks for the peerdir discovery registry: the binary
//! wire codec, the incremental request reassembler, the session table and
//! its state machine, the directory index, and the dispatcher that ties
//! them together. The daemon crate drives all of this from a
//! single-threaded reactor; nothing here touches a socket.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod config;
pub mod directory;
pub mod errors;
pub mod reassembly;
pub mod registry;
pub mod session;
pub mod types;
pub mod wire;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::Limits;
pub use errors::{PeerdirError, ProtocolViolation, Result, WireError};
pub use reassembly::RequestDecoder;
pub use registry::Registry;
pub use session::{PeerSession, SessionState, SessionTable};
pub use types::{PeerId, SlotId};
pub use wire::{Opcode, Request, SearchResponse, SEARCH_RESPONSE_LEN};
