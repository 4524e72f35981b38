//! Core identifier types shared across the peerdir protocol

use core::fmt;

// ----------------------------------------------------------------------------
// Peer Identifier
// ----------------------------------------------------------------------------

/// Peer-chosen 32-bit identifier carried in JOIN requests.
///
/// Uniqueness among joined peers is a convention between peers, not enforced
/// by the registry. The value `0` is reserved on the wire as the "not found"
/// sentinel in SEARCH responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(u32);

impl PeerId {
    /// Sentinel id used in the not-found SEARCH response
    pub const NOT_FOUND: PeerId = PeerId(0);

    /// Create a new peer id
    pub const fn new(id: u32) -> Self {
        PeerId(id)
    }

    /// Raw 32-bit value
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Network byte order encoding, as transmitted in JOIN and SEARCH responses
    pub const fn to_be_bytes(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Decode from network byte order
    pub const fn from_be_bytes(bytes: [u8; 4]) -> Self {
        PeerId(u32::from_be_bytes(bytes))
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PeerId {
    fn from(id: u32) -> Self {
        PeerId(id)
    }
}

// ----------------------------------------------------------------------------
// Session Slot Identifier
// ----------------------------------------------------------------------------

/// Handle to an occupied slot in the session table.
///
/// Issued by the table when a connection is admitted and used by the reactor
/// to route readiness events back to the owning session. A `SlotId` is only
/// meaningful while its slot is occupied; the table checks occupancy
/// explicitly rather than relying on a sentinel handle value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

impl SlotId {
    /// Create a slot id from a raw table index
    pub const fn new(index: usize) -> Self {
        SlotId(index)
    }

    /// Raw table index
    pub const fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_id_network_order_round_trip() {
        let id = PeerId::new(0xDEAD_BEEF);
        assert_eq!(id.to_be_bytes(), [0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(PeerId::from_be_bytes(id.to_be_bytes()), id);
    }

    #[test]
    fn test_not_found_sentinel_is_zero() {
        assert_eq!(PeerId::NOT_FOUND.as_u32(), 0);
    }
}
