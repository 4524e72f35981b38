//! Directory index: who hosts a given file name
//!
//! A linear scan over registered sessions in table order, each file list in
//! publish order. First exact match wins, which is also the documented
//! tie-break when two peers publish the same name. O(sessions x files) is
//! accepted at the bounded scale the registry runs at.

use crate::session::{SessionState, SessionTable};
use crate::wire::SearchResponse;

/// Resolve a file name to the first registered peer hosting it.
///
/// Matching is case-sensitive on the full string. Returns the all-zero
/// sentinel response when no registered session lists the name.
pub fn search(table: &SessionTable, name: &str) -> SearchResponse {
    for (_, session) in table.iter() {
        if session.state() != SessionState::Registered {
            continue;
        }
        if session.files().iter().any(|file| file == name) {
            if let Some(peer_id) = session.peer_id() {
                return SearchResponse::found(peer_id, session.addr());
            }
        }
    }
    SearchResponse::not_found()
}
