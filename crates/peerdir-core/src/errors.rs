//! Error types for the peerdir protocol
//!
//! Failures are connection-scoped by design: every variant here is fatal to
//! the one connection that produced it and never to the registry process.

use crate::session::SessionState;
use crate::types::SlotId;
use crate::wire::Opcode;

// ----------------------------------------------------------------------------
// Wire Decode Errors
// ----------------------------------------------------------------------------

/// Errors decoding fixed-format wire payloads
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("unknown opcode: {opcode:#04x}")]
    UnknownOpcode { opcode: u8 },

    #[error("payload too short (expected {expected} bytes, got {actual})")]
    Truncated { expected: usize, actual: usize },
}

// ----------------------------------------------------------------------------
// Protocol Violations
// ----------------------------------------------------------------------------

/// Peer behavior that terminates the connection, with no response sent.
///
/// One consistent policy applies on every path: a violation always closes
/// the connection and reclaims the session slot.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolViolation {
    #[error("unknown opcode: {opcode:#04x}")]
    UnknownOpcode { opcode: u8 },

    #[error("{opcode} not permitted in state {state}")]
    UnexpectedCommand { state: SessionState, opcode: Opcode },

    #[error("PUBLISH names {count} files, maximum is {max}")]
    TooManyFiles { count: u32, max: usize },

    #[error("file name of {len} bytes exceeds maximum of {max}")]
    NameTooLong { len: usize, max: usize },

    #[error("file name is not valid UTF-8")]
    MalformedName,

    #[error("pending buffer overflow (capacity {capacity} bytes)")]
    BufferOverflow { capacity: usize },
}

// ----------------------------------------------------------------------------
// Unified Error Type
// ----------------------------------------------------------------------------

/// Core error type for the peerdir registry
#[derive(Debug, thiserror::Error)]
pub enum PeerdirError {
    #[error("protocol violation: {0}")]
    Violation(#[from] ProtocolViolation),

    #[error("wire format error: {0}")]
    Wire(#[from] WireError),

    #[error("no session occupies slot {slot}")]
    SessionNotFound { slot: SlotId },
}

pub type Result<T> = core::result::Result<T, PeerdirError>;
