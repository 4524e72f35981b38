//! Peer sessions and the fixed-capacity session table
//!
//! One session exists per accepted connection, from accept until disconnect
//! or protocol violation. The table is a slot arena with explicit occupancy;
//! a reclaimed slot is fully reset before reuse.

use core::fmt;
use std::net::SocketAddrV4;

use crate::config::Limits;
use crate::errors::ProtocolViolation;
use crate::reassembly::RequestDecoder;
use crate::types::{PeerId, SlotId};
use crate::wire::Opcode;

// ----------------------------------------------------------------------------
// Session State Machine
// ----------------------------------------------------------------------------

/// Protocol state of one peer connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepted but not yet joined
    Unknown,
    /// JOINed with a peer id, no file list yet
    Joined,
    /// File list published; eligible to search and be found
    Registered,
}

impl SessionState {
    /// Transition table: current state x opcode -> next state or violation.
    ///
    /// Validation is decoupled from decoding; the decoder only produces
    /// well-formed requests, and this table decides whether the session may
    /// issue them. A REGISTERED peer may re-PUBLISH to replace its list.
    pub fn admits(
        self,
        opcode: Opcode,
    ) -> core::result::Result<SessionState, ProtocolViolation> {
        match (self, opcode) {
            (SessionState::Unknown, Opcode::Join) => Ok(SessionState::Joined),
            (SessionState::Joined | SessionState::Registered, Opcode::Publish) => {
                Ok(SessionState::Registered)
            }
            (SessionState::Registered, Opcode::Search) => Ok(SessionState::Registered),
            (state, opcode) => Err(ProtocolViolation::UnexpectedCommand { state, opcode }),
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unknown => "UNKNOWN",
            SessionState::Joined => "JOINED",
            SessionState::Registered => "REGISTERED",
        };
        f.write_str(name)
    }
}

// ----------------------------------------------------------------------------
// Peer Session
// ----------------------------------------------------------------------------

/// Server-side record of one peer connection
#[derive(Debug)]
pub struct PeerSession {
    /// Peer-chosen id; set on JOIN
    id: Option<PeerId>,
    /// Remote address captured at accept time, reused for SEARCH responses
    addr: SocketAddrV4,
    /// Published file names, replaced wholesale on each PUBLISH
    files: Vec<String>,
    state: SessionState,
    decoder: RequestDecoder,
}

impl PeerSession {
    /// Create a fresh session for a newly accepted connection
    pub fn new(addr: SocketAddrV4, limits: &Limits) -> Self {
        Self {
            id: None,
            addr,
            files: Vec::new(),
            state: SessionState::Unknown,
            decoder: RequestDecoder::new(limits),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn peer_id(&self) -> Option<PeerId> {
        self.id
    }

    pub fn addr(&self) -> SocketAddrV4 {
        self.addr
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Incremental decoder for this connection's byte stream
    pub fn decoder(&mut self) -> &mut RequestDecoder {
        &mut self.decoder
    }

    /// Record the peer id announced by a valid JOIN
    pub fn join(&mut self, peer_id: PeerId) {
        self.id = Some(peer_id);
    }

    /// Install a published file list, replacing any prior list atomically
    pub fn publish(&mut self, files: Vec<String>) {
        self.files = files;
    }

    /// Advance to the state the transition table produced
    pub fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }
}

// ----------------------------------------------------------------------------
// Session Table
// ----------------------------------------------------------------------------

/// Fixed-capacity slot arena of peer sessions.
///
/// Slot order is stable and doubles as the search iteration order. The live
/// session count never exceeds capacity; `insert` reports rejection instead.
#[derive(Debug)]
pub struct SessionTable {
    slots: Vec<Option<PeerSession>>,
}

impl SessionTable {
    /// Create a table with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_none())
    }

    /// Admit a session into the first free slot.
    ///
    /// Returns `None` when the table is at capacity; existing sessions are
    /// untouched and the caller closes the new connection.
    pub fn insert(&mut self, session: PeerSession) -> Option<SlotId> {
        let index = self.slots.iter().position(|slot| slot.is_none())?;
        self.slots[index] = Some(session);
        Some(SlotId::new(index))
    }

    pub fn get(&self, slot: SlotId) -> Option<&PeerSession> {
        self.slots.get(slot.index())?.as_ref()
    }

    pub fn get_mut(&mut self, slot: SlotId) -> Option<&mut PeerSession> {
        self.slots.get_mut(slot.index())?.as_mut()
    }

    /// Reclaim a slot for reuse, dropping the session and its file list
    pub fn remove(&mut self, slot: SlotId) -> Option<PeerSession> {
        self.slots.get_mut(slot.index())?.take()
    }

    /// Occupied slots in table order
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &PeerSession)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|s| (SlotId::new(index), s)))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
