//! Single-threaded readiness reactor for the registry
//!
//! One loop multiplexes the listening socket and every live peer stream on
//! a current-thread runtime. Nothing blocks except the readiness wait
//! itself: reads are `try_read`, responses go out with a single
//! non-retrying write, and every failure is fatal only to the connection
//! that produced it. The stream table is owned exclusively by this loop,
//! created at startup and mutated only on accept and disconnect.

use std::io;
use std::net::{SocketAddr, SocketAddrV4};

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use peerdir_core::{Limits, Registry, SearchResponse, SlotId};

// ----------------------------------------------------------------------------
// Wake Events
// ----------------------------------------------------------------------------

/// What the readiness wait produced on one iteration
enum Wake {
    /// The listener has a pending connection
    Incoming(io::Result<(TcpStream, SocketAddr)>),
    /// A peer stream reported read readiness
    Readable(SlotId, io::Result<()>),
}

// ----------------------------------------------------------------------------
// Reactor
// ----------------------------------------------------------------------------

/// The registry server: listener, session registry, and live peer streams.
///
/// Streams are stored in a slot vector parallel to the registry's session
/// table, so a `SlotId` addresses both the protocol state and the socket.
pub struct Reactor {
    listener: TcpListener,
    registry: Registry,
    streams: Vec<Option<TcpStream>>,
    recv_buffer: usize,
}

impl Reactor {
    /// Bind the listening socket and initialize an empty session table
    pub async fn bind(addr: SocketAddr, limits: Limits) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let streams = (0..limits.max_peers).map(|_| None).collect();
        let recv_buffer = limits.recv_buffer;
        Ok(Self {
            listener,
            registry: Registry::new(limits),
            streams,
            recv_buffer,
        })
    }

    /// Address the listener actually bound (port 0 resolves here)
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Drive the reactor until process termination.
    ///
    /// Each iteration waits for readiness on the listener or any live
    /// stream, then services exactly one event. Peer errors never escape
    /// this loop.
    pub async fn run(mut self) -> io::Result<()> {
        info!(addr = %self.local_addr()?, "registry listening");
        loop {
            let wake = {
                let readable = Self::next_readable(&self.streams);
                tokio::select! {
                    result = self.listener.accept() => Wake::Incoming(result),
                    (slot, result) = readable => Wake::Readable(slot, result),
                }
            };

            match wake {
                Wake::Incoming(Ok((stream, addr))) => self.admit(stream, addr),
                Wake::Incoming(Err(error)) => {
                    // Fatal only to the connection that failed to accept.
                    warn!(%error, "accept failed");
                }
                Wake::Readable(slot, Ok(())) => self.service(slot),
                Wake::Readable(slot, Err(error)) => {
                    warn!(%slot, %error, "readiness error on peer stream");
                    self.close(slot);
                }
            }
        }
    }

    /// Resolve read readiness across all live streams; pending forever when
    /// there are none, so the loop waits on the listener alone.
    async fn next_readable(streams: &[Option<TcpStream>]) -> (SlotId, io::Result<()>) {
        let mut readiness: FuturesUnordered<_> = streams
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                slot.as_ref().map(|stream| async move {
                    (SlotId::new(index), stream.readable().await)
                })
            })
            .collect();

        match readiness.next().await {
            Some(wake) => wake,
            None => std::future::pending().await,
        }
    }

    /// Admit an accepted connection or reject it by dropping the stream
    fn admit(&mut self, stream: TcpStream, addr: SocketAddr) {
        let Some(addr) = as_ipv4(addr) else {
            warn!(%addr, "rejecting non-IPv4 peer");
            return;
        };
        match self.registry.connect(addr) {
            Some(slot) => {
                info!(%addr, %slot, "accepted peer connection");
                self.streams[slot.index()] = Some(stream);
            }
            None => {
                // Dropping the stream closes it; existing sessions are
                // untouched.
                warn!(%addr, "session table full, rejecting connection");
            }
        }
    }

    /// Service one read-readiness event on a peer stream
    fn service(&mut self, slot: SlotId) {
        let mut buf = vec![0u8; self.recv_buffer];
        let read = match self.streams[slot.index()].as_ref() {
            Some(stream) => stream.try_read(&mut buf),
            None => return,
        };

        match read {
            Ok(0) => {
                info!(%slot, "peer disconnected");
                self.close(slot);
            }
            Ok(n) => self.deliver(slot, &buf[..n]),
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                // Spurious wakeup under level-triggered readiness.
                debug!(%slot, "spurious readiness");
            }
            Err(error) => {
                warn!(%slot, %error, "read failed");
                self.close(slot);
            }
        }
    }

    /// Push received bytes through the registry and send any responses
    fn deliver(&mut self, slot: SlotId, bytes: &[u8]) {
        match self.registry.receive(slot, bytes) {
            Ok(responses) => {
                for response in responses {
                    if !self.send(slot, &response) {
                        self.close(slot);
                        return;
                    }
                }
            }
            Err(error) => {
                // Wrong state, oversized payload, malformed field: one
                // consistent policy, the connection is closed with no
                // response sent.
                warn!(%slot, %error, "closing connection");
                self.close(slot);
            }
        }
    }

    /// Write one 10-byte response with a single non-retrying write
    fn send(&mut self, slot: SlotId, response: &SearchResponse) -> bool {
        let Some(stream) = self.streams[slot.index()].as_ref() else {
            return false;
        };
        let bytes = response.encode();
        match stream.try_write(&bytes) {
            Ok(n) if n == bytes.len() => true,
            Ok(n) => {
                warn!(%slot, wrote = n, "short write on search response");
                false
            }
            Err(error) => {
                warn!(%slot, %error, "failed to send search response");
                false
            }
        }
    }

    /// Reclaim the session slot and close the socket
    fn close(&mut self, slot: SlotId) {
        self.registry.disconnect(slot);
        self.streams[slot.index()] = None;
    }
}

/// Reduce an accepted address to IPv4, unmapping v4-in-v6 when the listener
/// is dual-stack
fn as_ipv4(addr: SocketAddr) -> Option<SocketAddrV4> {
    match addr {
        SocketAddr::V4(v4) => Some(v4),
        SocketAddr::V6(v6) => v6
            .ip()
            .to_ipv4_mapped()
            .map(|ip| SocketAddrV4::new(ip, v6.port())),
    }
}
