//! Registry limit configuration
//!
//! Consolidates the bounds the registry enforces on peers so that the
//! session table, request decoder, and daemon all read from one place.

// ----------------------------------------------------------------------------
// Limits
// ----------------------------------------------------------------------------

/// Hard bounds enforced on every peer connection
#[derive(Debug, Clone)]
pub struct Limits {
    /// Maximum number of simultaneously connected peers
    pub max_peers: usize,
    /// Maximum number of files a single PUBLISH may carry
    pub max_files: usize,
    /// Maximum file name length in bytes, excluding the null terminator
    pub max_name_bytes: usize,
    /// Hard capacity of the per-connection pending buffer
    pub pending_capacity: usize,
    /// Size of the read buffer used per readiness event
    pub recv_buffer: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_peers: 5,
            max_files: 10,
            max_name_bytes: 127, // 128-byte name buffer including terminator
            // Holds one partial request plus a full receive; the decoder
            // drains complete requests after every feed.
            pending_capacity: 2048,
            recv_buffer: 1024,
        }
    }
}

impl Limits {
    /// Tight limits for exercising rejection paths in tests
    pub fn testing() -> Self {
        Self {
            max_peers: 2,
            max_files: 3,
            max_name_bytes: 15,
            pending_capacity: 128,
            recv_buffer: 64,
        }
    }

    /// Validate the configuration for consistency and feasibility
    pub fn validate(&self) -> core::result::Result<(), String> {
        if self.max_peers == 0 {
            return Err("max peers cannot be zero".into());
        }
        if self.max_files == 0 {
            return Err("max files cannot be zero".into());
        }
        if self.max_name_bytes == 0 {
            return Err("max name length cannot be zero".into());
        }
        if self.pending_capacity <= self.max_name_bytes {
            return Err("pending buffer must hold at least one full name".into());
        }
        if self.recv_buffer == 0 {
            return Err("receive buffer cannot be zero".into());
        }
        if self.pending_capacity < self.recv_buffer {
            return Err("pending buffer must hold at least one full receive".into());
        }
        Ok(())
    }
}
