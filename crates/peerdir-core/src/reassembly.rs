//! Incremental request reassembly from a chunked byte stream
//!
//! Stream sockets deliver arbitrary chunking: a single request may arrive
//! across several reads, and one read may carry several requests. The
//! decoder accumulates raw bytes per connection and yields complete
//! requests as soon as they can be extracted, never blocking and never
//! discarding unconsumed bytes.

use core::mem;

use crate::config::Limits;
use crate::errors::ProtocolViolation;
use crate::wire::{Opcode, Request};

// ----------------------------------------------------------------------------
// Decode State
// ----------------------------------------------------------------------------

/// Position within the request currently being reassembled
#[derive(Debug, Clone)]
enum DecodeState {
    /// Waiting for the next opcode byte
    Opcode,
    /// JOIN: waiting for the 4-byte peer id
    JoinId,
    /// PUBLISH: waiting for the 4-byte file count
    PublishCount,
    /// PUBLISH: extracting `remaining` null-terminated names
    PublishNames { remaining: u32, files: Vec<String> },
    /// SEARCH or FETCH: waiting for one null-terminated name
    Name { opcode: Opcode },
}

// ----------------------------------------------------------------------------
// Request Decoder
// ----------------------------------------------------------------------------

/// Per-connection incremental decoder with a bounded pending buffer.
///
/// Names already terminated are extracted as they arrive, so the buffer
/// holds at most one unterminated name plus a few header bytes. Exceeding
/// any bound is a protocol violation that terminates the connection.
#[derive(Debug)]
pub struct RequestDecoder {
    buf: Vec<u8>,
    state: DecodeState,
    max_files: usize,
    max_name_bytes: usize,
    capacity: usize,
}

impl RequestDecoder {
    /// Create a decoder bounded by the given limits
    pub fn new(limits: &Limits) -> Self {
        Self {
            buf: Vec::new(),
            state: DecodeState::Opcode,
            max_files: limits.max_files,
            max_name_bytes: limits.max_name_bytes,
            capacity: limits.pending_capacity,
        }
    }

    /// Number of received bytes not yet consumed by a complete request
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Append newly received bytes to the pending buffer
    pub fn feed(&mut self, bytes: &[u8]) -> core::result::Result<(), ProtocolViolation> {
        if self.buf.len() + bytes.len() > self.capacity {
            return Err(ProtocolViolation::BufferOverflow {
                capacity: self.capacity,
            });
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Extract the next complete request, if one has accumulated.
    ///
    /// Returns `Ok(None)` when more bytes are needed; unconsumed bytes stay
    /// at the front of the buffer for the next call.
    pub fn next_request(
        &mut self,
    ) -> core::result::Result<Option<Request>, ProtocolViolation> {
        loop {
            match &mut self.state {
                DecodeState::Opcode => {
                    let Some(&raw) = self.buf.first() else {
                        return Ok(None);
                    };
                    let opcode = Opcode::try_from(raw)
                        .map_err(|_| ProtocolViolation::UnknownOpcode { opcode: raw })?;
                    self.buf.drain(..1);
                    self.state = match opcode {
                        Opcode::Join => DecodeState::JoinId,
                        Opcode::Publish => DecodeState::PublishCount,
                        Opcode::Search | Opcode::Fetch => DecodeState::Name { opcode },
                    };
                }
                DecodeState::JoinId => {
                    let Some(peer_id) = take_u32(&mut self.buf) else {
                        return Ok(None);
                    };
                    self.state = DecodeState::Opcode;
                    return Ok(Some(Request::Join {
                        peer_id: peer_id.into(),
                    }));
                }
                DecodeState::PublishCount => {
                    let Some(count) = take_u32(&mut self.buf) else {
                        return Ok(None);
                    };
                    if count as usize > self.max_files {
                        return Err(ProtocolViolation::TooManyFiles {
                            count,
                            max: self.max_files,
                        });
                    }
                    if count == 0 {
                        self.state = DecodeState::Opcode;
                        return Ok(Some(Request::Publish { files: Vec::new() }));
                    }
                    self.state = DecodeState::PublishNames {
                        remaining: count,
                        files: Vec::with_capacity(count as usize),
                    };
                }
                DecodeState::PublishNames { remaining, files } => {
                    while *remaining > 0 {
                        match take_name(&mut self.buf, self.max_name_bytes)? {
                            Some(name) => {
                                files.push(name);
                                *remaining -= 1;
                            }
                            None => return Ok(None),
                        }
                    }
                    let files = mem::take(files);
                    self.state = DecodeState::Opcode;
                    return Ok(Some(Request::Publish { files }));
                }
                DecodeState::Name { opcode } => {
                    let opcode = *opcode;
                    let Some(name) = take_name(&mut self.buf, self.max_name_bytes)? else {
                        return Ok(None);
                    };
                    self.state = DecodeState::Opcode;
                    return Ok(Some(match opcode {
                        Opcode::Search => Request::Search { name },
                        _ => Request::Fetch { name },
                    }));
                }
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Field Extraction
// ----------------------------------------------------------------------------

/// Consume a big-endian u32 from the buffer front, if present
fn take_u32(buf: &mut Vec<u8>) -> Option<u32> {
    if buf.len() < 4 {
        return None;
    }
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[..4]);
    buf.drain(..4);
    Some(u32::from_be_bytes(bytes))
}

/// Consume one null-terminated name from the buffer front.
///
/// A name at exactly `max` bytes is valid; one byte over, or a name that can
/// no longer terminate within `max` bytes, is a violation.
fn take_name(
    buf: &mut Vec<u8>,
    max: usize,
) -> core::result::Result<Option<String>, ProtocolViolation> {
    match buf.iter().position(|&b| b == 0) {
        Some(pos) => {
            if pos > max {
                return Err(ProtocolViolation::NameTooLong { len: pos, max });
            }
            let name = core::str::from_utf8(&buf[..pos])
                .map_err(|_| ProtocolViolation::MalformedName)?
                .to_owned();
            buf.drain(..=pos);
            Ok(Some(name))
        }
        None => {
            if buf.len() > max {
                return Err(ProtocolViolation::NameTooLong {
                    len: buf.len(),
                    max,
                });
            }
            Ok(None)
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PeerId;
    use crate::wire;

    fn make_decoder() -> RequestDecoder {
        RequestDecoder::new(&Limits::default())
    }

    fn drain(decoder: &mut RequestDecoder) -> Vec<Request> {
        let mut requests = Vec::new();
        while let Some(request) = decoder.next_request().unwrap() {
            requests.push(request);
        }
        requests
    }

    #[test]
    fn test_join_single_read() {
        let mut decoder = make_decoder();
        decoder.feed(&wire::encode_join(PeerId::new(7))).unwrap();
        assert_eq!(
            drain(&mut decoder),
            vec![Request::Join {
                peer_id: PeerId::new(7)
            }]
        );
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn test_join_byte_at_a_time() {
        let mut decoder = make_decoder();
        for &byte in &wire::encode_join(PeerId::new(42)) {
            decoder.feed(&[byte]).unwrap();
        }
        assert_eq!(
            drain(&mut decoder),
            vec![Request::Join {
                peer_id: PeerId::new(42)
            }]
        );
    }

    #[test]
    fn test_publish_two_names_across_three_reads() {
        // Second name split mid-string; must decode identically to one read.
        let bytes = wire::encode_publish(&["alpha.txt", "beta.txt"]);
        let mut decoder = make_decoder();

        decoder.feed(&bytes[..7]).unwrap();
        assert!(decoder.next_request().unwrap().is_none());

        decoder.feed(&bytes[7..bytes.len() - 3]).unwrap();
        assert!(decoder.next_request().unwrap().is_none());

        decoder.feed(&bytes[bytes.len() - 3..]).unwrap();
        assert_eq!(
            drain(&mut decoder),
            vec![Request::Publish {
                files: vec!["alpha.txt".into(), "beta.txt".into()]
            }]
        );
    }

    #[test]
    fn test_publish_zero_files_is_valid() {
        let mut decoder = make_decoder();
        decoder.feed(&wire::encode_publish(&[])).unwrap();
        assert_eq!(
            drain(&mut decoder),
            vec![Request::Publish { files: Vec::new() }]
        );
    }

    #[test]
    fn test_publish_too_many_files_is_violation() {
        let names: Vec<String> = (0..11).map(|i| format!("f{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut decoder = make_decoder();
        decoder.feed(&wire::encode_publish(&refs)).unwrap();
        assert!(matches!(
            decoder.next_request(),
            Err(ProtocolViolation::TooManyFiles { count: 11, max: 10 })
        ));
    }

    #[test]
    fn test_name_length_boundary() {
        let max = Limits::default().max_name_bytes;

        // Exactly at the boundary: valid.
        let name = "n".repeat(max);
        let mut decoder = make_decoder();
        decoder.feed(&wire::encode_search(&name)).unwrap();
        assert_eq!(drain(&mut decoder), vec![Request::Search { name }]);

        // One byte over: rejected.
        let name = "n".repeat(max + 1);
        let mut decoder = make_decoder();
        decoder.feed(&wire::encode_search(&name)).unwrap();
        assert!(matches!(
            decoder.next_request(),
            Err(ProtocolViolation::NameTooLong { .. })
        ));
    }

    #[test]
    fn test_unterminated_name_rejected_once_overlong() {
        // No terminator in sight and already past the limit: the request can
        // never complete, so it is rejected without waiting for more bytes.
        let mut decoder = make_decoder();
        let mut bytes = vec![Opcode::Search as u8];
        bytes.extend_from_slice(&[b'x'; 200]);
        decoder.feed(&bytes).unwrap();
        assert!(matches!(
            decoder.next_request(),
            Err(ProtocolViolation::NameTooLong { .. })
        ));
    }

    #[test]
    fn test_unknown_opcode_is_violation() {
        let mut decoder = make_decoder();
        decoder.feed(&[9]).unwrap();
        assert!(matches!(
            decoder.next_request(),
            Err(ProtocolViolation::UnknownOpcode { opcode: 9 })
        ));
    }

    #[test]
    fn test_non_utf8_name_is_violation() {
        let mut decoder = make_decoder();
        decoder.feed(&[Opcode::Search as u8, 0xFF, 0xFE, 0]).unwrap();
        assert!(matches!(
            decoder.next_request(),
            Err(ProtocolViolation::MalformedName)
        ));
    }

    #[test]
    fn test_pipelined_requests_in_one_read() {
        let mut bytes = wire::encode_join(PeerId::new(3));
        bytes.extend_from_slice(&wire::encode_publish(&["x.txt"]));
        bytes.extend_from_slice(&wire::encode_search("x.txt"));

        let mut decoder = make_decoder();
        decoder.feed(&bytes).unwrap();
        let requests = drain(&mut decoder);
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[2], Request::Search { name: "x.txt".into() });
    }

    #[test]
    fn test_buffer_overflow_is_violation() {
        let limits = Limits::testing();
        let mut decoder = RequestDecoder::new(&limits);
        let oversized = vec![0u8; limits.pending_capacity + 1];
        assert!(matches!(
            decoder.feed(&oversized),
            Err(ProtocolViolation::BufferOverflow { .. })
        ));
    }

    #[test]
    fn test_fetch_decodes_like_search() {
        let mut decoder = make_decoder();
        decoder.feed(&wire::encode_fetch("movie.mp4")).unwrap();
        assert_eq!(
            drain(&mut decoder),
            vec![Request::Fetch {
                name: "movie.mp4".into()
            }]
        );
    }
}
