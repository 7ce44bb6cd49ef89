//! Datagram receiver: N parallel port-sharing sockets.
//!
//! Each worker thread owns one UDP socket bound to the same port with
//! `SO_REUSEPORT` (the kernel hashes the 4-tuple across sockets), a large
//! receive buffer, and a 1 s receive timeout so the loop can observe the
//! shutdown flag. One datagram is one wire packet; no extra framing.

use std::net::{SocketAddr, UdpSocket};

use ringmpmc::Ring;
use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, error};

use super::{is_transient, DEFAULT_RECV_BUFFER, MAX_DATAGRAM, RECV_TIMEOUT};
use crate::error::StartupError;
use crate::shutdown::Shutdown;
use crate::stats::Stats;

/// A bound set of port-sharing datagram sockets, one per worker.
pub struct UdpReceiver {
    sockets: Vec<UdpSocket>,
    local_addr: SocketAddr,
}

impl UdpReceiver {
    /// Binds `workers` sockets to `0.0.0.0:port`.
    ///
    /// With `port == 0` the first socket picks the ephemeral port and the
    /// remaining workers bind to it.
    pub fn bind(port: u16, workers: usize) -> Result<Self, StartupError> {
        let map_err = |source| StartupError::BindUdp { port, source };

        let first = bind_socket(port).map_err(map_err)?;
        let local_addr = first.local_addr().map_err(map_err)?;

        let mut sockets = vec![first];
        for _ in 1..workers {
            sockets.push(bind_socket(local_addr.port()).map_err(map_err)?);
        }

        Ok(Self {
            sockets,
            local_addr,
        })
    }

    /// The bound address (reports the real port when 0 was requested).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of bound sockets (= worker threads to spawn).
    pub fn socket_count(&self) -> usize {
        self.sockets.len()
    }

    /// Receive loop for worker `index`. Runs until shutdown or a
    /// persistent socket error (which terminates this worker only).
    pub fn run_worker(&self, index: usize, ring: &Ring, stats: &Stats, shutdown: &Shutdown) {
        let socket = &self.sockets[index];
        let mut buf = [0u8; MAX_DATAGRAM];

        debug!(index, addr = %self.local_addr, "datagram worker started");
        while !shutdown.is_requested() {
            match socket.recv(&mut buf) {
                Ok(n) => {
                    stats.record_recv(n);
                    if ring.try_push(&buf[..n]).is_err() {
                        stats.record_drop();
                    }
                }
                Err(e) if is_transient(&e) => {}
                Err(e) => {
                    stats.record_recv_error();
                    error!(index, error = %e, "datagram worker terminating");
                    return;
                }
            }
        }
        debug!(index, "datagram worker stopped");
    }
}

/// One port-sharing datagram socket with the receiver tuning applied.
fn bind_socket(port: u16) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
    socket.set_reuse_port(true)?;

    // Best effort: the kernel may clamp this below the request.
    let _ = socket.set_recv_buffer_size(DEFAULT_RECV_BUFFER);
    socket.set_read_timeout(Some(RECV_TIMEOUT))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    socket.bind(&addr.into())?;
    Ok(socket.into())
}
