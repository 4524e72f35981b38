//! Registry dispatcher: the sans-I/O hub the reactor drives
//!
//! Owns the session table and applies decoded requests through the state
//! machine. All mutation happens on the caller's single thread; any error
//! returned here is fatal to that one connection only.

use std::net::SocketAddrV4;

use tracing::{debug, info};

use crate::config::Limits;
use crate::directory;
use crate::errors::{PeerdirError, ProtocolViolation, Result};
use crate::session::{PeerSession, SessionTable};
use crate::types::SlotId;
use crate::wire::{Opcode, Request, SearchResponse};

// ----------------------------------------------------------------------------
// Registry
// ----------------------------------------------------------------------------

/// Process-wide registry state: session table plus enforced limits
#[derive(Debug)]
pub struct Registry {
    table: SessionTable,
    limits: Limits,
}

impl Registry {
    /// Create a registry bounded by the given limits
    pub fn new(limits: Limits) -> Self {
        Self {
            table: SessionTable::new(limits.max_peers),
            limits,
        }
    }

    /// Number of live sessions
    pub fn session_count(&self) -> usize {
        self.table.len()
    }

    /// Admit a newly accepted connection.
    ///
    /// Returns `None` when the table is at capacity; the caller must close
    /// the connection immediately. Existing sessions are never affected.
    pub fn connect(&mut self, addr: SocketAddrV4) -> Option<SlotId> {
        let slot = self.table.insert(PeerSession::new(addr, &self.limits))?;
        debug!(%addr, %slot, "session admitted");
        Some(slot)
    }

    /// Reclaim a session slot after disconnect or violation
    pub fn disconnect(&mut self, slot: SlotId) {
        if let Some(session) = self.table.remove(slot) {
            debug!(%slot, addr = %session.addr(), "session reclaimed");
        }
    }

    /// Feed received bytes to a session and dispatch every complete request.
    ///
    /// Returns the SEARCH responses to send, in order. Any error closes the
    /// connection: the caller disconnects the slot and drops the stream.
    pub fn receive(&mut self, slot: SlotId, bytes: &[u8]) -> Result<Vec<SearchResponse>> {
        let session = self
            .table
            .get_mut(slot)
            .ok_or(PeerdirError::SessionNotFound { slot })?;

        session.decoder().feed(bytes)?;
        let mut requests = Vec::new();
        while let Some(request) = session.decoder().next_request()? {
            requests.push(request);
        }

        let mut responses = Vec::new();
        for request in requests {
            if let Some(response) = self.dispatch(slot, request)? {
                responses.push(response);
            }
        }
        Ok(responses)
    }

    /// Validate one request against the session's state and apply it
    fn dispatch(&mut self, slot: SlotId, request: Request) -> Result<Option<SearchResponse>> {
        let session = self
            .table
            .get(slot)
            .ok_or(PeerdirError::SessionNotFound { slot })?;
        let state = session.state();
        let next = state.admits(request.opcode())?;
        let addr = session.addr();

        match request {
            Request::Join { peer_id } => {
                let session = self.session_mut(slot)?;
                session.join(peer_id);
                session.set_state(next);
                info!(%peer_id, %addr, "peer joined");
                Ok(None)
            }
            Request::Publish { files } => {
                // Count and name-length bounds were enforced during decode,
                // so installation is all-or-nothing here.
                info!(%addr, count = files.len(), files = ?files, "peer published");
                let session = self.session_mut(slot)?;
                session.publish(files);
                session.set_state(next);
                Ok(None)
            }
            Request::Search { name } => {
                self.session_mut(slot)?.set_state(next);
                let response = directory::search(&self.table, &name);
                if response.is_not_found() {
                    info!(%addr, name = %name, "search miss");
                } else {
                    info!(
                        %addr,
                        name = %name,
                        owner = %response.peer_id,
                        owner_addr = %response.addr,
                        owner_port = response.port,
                        "search hit"
                    );
                }
                Ok(Some(response))
            }
            // The transition table rejects FETCH in every state; this arm
            // only runs if that ever changes, and it still refuses.
            Request::Fetch { .. } => Err(ProtocolViolation::UnexpectedCommand {
                state,
                opcode: Opcode::Fetch,
            }
            .into()),
        }
    }

    fn session_mut(&mut self, slot: SlotId) -> Result<&mut PeerSession> {
        self.table
            .get_mut(slot)
            .ok_or(PeerdirError::SessionNotFound { slot })
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
