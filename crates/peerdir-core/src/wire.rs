//! Wire format for the peerdir registry protocol
//!
//! Requests are length-implicit: a one-byte opcode selects the payload
//! layout, integers travel in network byte order, and file names are
//! null-terminated byte strings. The SEARCH response is a fixed 10-byte
//! record. Encoding is byte-identical on every platform.

use core::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

use crate::errors::WireError;
use crate::types::PeerId;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Size of the fixed SEARCH response record
pub const SEARCH_RESPONSE_LEN: usize = 10;

/// Size of the JOIN request (opcode + peer id)
pub const JOIN_REQUEST_LEN: usize = 5;

// ----------------------------------------------------------------------------
// Opcodes
// ----------------------------------------------------------------------------

/// One-byte command discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Join = 0,
    Publish = 1,
    Search = 2,
    /// Served peer-to-peer; the registry rejects it
    Fetch = 3,
}

impl TryFrom<u8> for Opcode {
    type Error = WireError;

    fn try_from(value: u8) -> core::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Opcode::Join),
            1 => Ok(Opcode::Publish),
            2 => Ok(Opcode::Search),
            3 => Ok(Opcode::Fetch),
            opcode => Err(WireError::UnknownOpcode { opcode }),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Opcode::Join => "JOIN",
            Opcode::Publish => "PUBLISH",
            Opcode::Search => "SEARCH",
            Opcode::Fetch => "FETCH",
        };
        f.write_str(name)
    }
}

// ----------------------------------------------------------------------------
// Requests
// ----------------------------------------------------------------------------

/// A complete, decoded registry request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Join { peer_id: PeerId },
    Publish { files: Vec<String> },
    Search { name: String },
    Fetch { name: String },
}

impl Request {
    /// Opcode this request travels under
    pub fn opcode(&self) -> Opcode {
        match self {
            Request::Join { .. } => Opcode::Join,
            Request::Publish { .. } => Opcode::Publish,
            Request::Search { .. } => Opcode::Search,
            Request::Fetch { .. } => Opcode::Fetch,
        }
    }
}

// ----------------------------------------------------------------------------
// Request Encoders
// ----------------------------------------------------------------------------
//
// Used by peers (and by the registry's own tests as the interoperability
// oracle). The registry decodes the same layouts incrementally in
// `reassembly`.

/// Encode a JOIN request: opcode + 4-byte big-endian peer id
pub fn encode_join(peer_id: PeerId) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(JOIN_REQUEST_LEN);
    bytes.push(Opcode::Join as u8);
    bytes.extend_from_slice(&peer_id.to_be_bytes());
    bytes
}

/// Encode a PUBLISH request: opcode + 4-byte big-endian count + names,
/// each terminated by a null byte
pub fn encode_publish(names: &[&str]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.push(Opcode::Publish as u8);
    bytes.extend_from_slice(&(names.len() as u32).to_be_bytes());
    for name in names {
        bytes.extend_from_slice(name.as_bytes());
        bytes.push(0);
    }
    bytes
}

/// Encode a SEARCH request: opcode + null-terminated name
pub fn encode_search(name: &str) -> Vec<u8> {
    encode_named(Opcode::Search, name)
}

/// Encode a FETCH request: opcode + null-terminated name
pub fn encode_fetch(name: &str) -> Vec<u8> {
    encode_named(Opcode::Fetch, name)
}

fn encode_named(opcode: Opcode, name: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(name.len() + 2);
    bytes.push(opcode as u8);
    bytes.extend_from_slice(name.as_bytes());
    bytes.push(0);
    bytes
}

// ----------------------------------------------------------------------------
// Search Response
// ----------------------------------------------------------------------------

/// Fixed 10-byte SEARCH response: peer id, IPv4 address, port.
///
/// An all-zero record is the "not found" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResponse {
    pub peer_id: PeerId,
    pub addr: Ipv4Addr,
    pub port: u16,
}

impl SearchResponse {
    /// Response for a successful lookup
    pub fn found(peer_id: PeerId, addr: SocketAddrV4) -> Self {
        Self {
            peer_id,
            addr: *addr.ip(),
            port: addr.port(),
        }
    }

    /// The all-zero "not found" sentinel
    pub const fn not_found() -> Self {
        Self {
            peer_id: PeerId::NOT_FOUND,
            addr: Ipv4Addr::UNSPECIFIED,
            port: 0,
        }
    }

    /// Whether this response carries the not-found sentinel
    pub fn is_not_found(&self) -> bool {
        self.peer_id == PeerId::NOT_FOUND
    }

    /// Encode to the fixed 10-byte wire record
    pub fn encode(&self) -> [u8; SEARCH_RESPONSE_LEN] {
        let mut bytes = [0u8; SEARCH_RESPONSE_LEN];
        bytes[0..4].copy_from_slice(&self.peer_id.to_be_bytes());
        bytes[4..8].copy_from_slice(&self.addr.octets());
        bytes[8..10].copy_from_slice(&self.port.to_be_bytes());
        bytes
    }

    /// Decode from the fixed 10-byte wire record
    pub fn decode(bytes: &[u8]) -> core::result::Result<Self, WireError> {
        if bytes.len() < SEARCH_RESPONSE_LEN {
            return Err(WireError::Truncated {
                expected: SEARCH_RESPONSE_LEN,
                actual: bytes.len(),
            });
        }

        let mut id = [0u8; 4];
        id.copy_from_slice(&bytes[0..4]);
        let mut octets = [0u8; 4];
        octets.copy_from_slice(&bytes[4..8]);
        let mut port = [0u8; 2];
        port.copy_from_slice(&bytes[8..10]);

        Ok(Self {
            peer_id: PeerId::from_be_bytes(id),
            addr: Ipv4Addr::from(octets),
            port: u16::from_be_bytes(port),
        })
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_round_trip() {
        for raw in 0u8..=3 {
            let opcode = Opcode::try_from(raw).unwrap();
            assert_eq!(opcode as u8, raw);
        }
        assert!(Opcode::try_from(4).is_err());
        assert!(Opcode::try_from(0xFF).is_err());
    }

    #[test]
    fn test_join_encoding_is_network_order() {
        let bytes = encode_join(PeerId::new(7));
        assert_eq!(bytes, vec![0, 0, 0, 0, 7]);
    }

    #[test]
    fn test_publish_encoding_layout() {
        let bytes = encode_publish(&["a.txt", "b"]);
        let mut expected = vec![1, 0, 0, 0, 2];
        expected.extend_from_slice(b"a.txt\0b\0");
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_empty_publish_is_five_bytes() {
        assert_eq!(encode_publish(&[]), vec![1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_search_encoding_null_terminated() {
        assert_eq!(encode_search("x.txt"), b"\x02x.txt\0".to_vec());
        assert_eq!(encode_fetch("x.txt"), b"\x03x.txt\0".to_vec());
    }

    #[test]
    fn test_search_response_encoding() {
        let response = SearchResponse::found(
            PeerId::new(7),
            SocketAddrV4::new(Ipv4Addr::new(192, 168, 1, 20), 5000),
        );
        let bytes = response.encode();
        assert_eq!(bytes, [0, 0, 0, 7, 192, 168, 1, 20, 0x13, 0x88]);
        assert_eq!(SearchResponse::decode(&bytes).unwrap(), response);
    }

    #[test]
    fn test_not_found_sentinel_is_all_zero() {
        let response = SearchResponse::not_found();
        assert!(response.is_not_found());
        assert_eq!(response.encode(), [0u8; SEARCH_RESPONSE_LEN]);
    }

    #[test]
    fn test_truncated_response_rejected() {
        let err = SearchResponse::decode(&[0u8; 9]).unwrap_err();
        assert!(matches!(err, WireError::Truncated { expected: 10, actual: 9 }));
    }
}
