//! Stream receiver: accept loop plus a length-prefixed framer.
//!
//! Each stream message is `u32 LE total_len` followed by `total_len` bytes
//! of wire packet (32-byte header + payload). Frames declaring less than a
//! header or more than [`MAX_DATAGRAM`] are framing errors that close the
//! connection.
//!
//! Connections are served inline on the accept thread: a benchmark-grade
//! simplification that keeps the receiver single-threaded. EOF in either
//! read state closes the connection cleanly.

use std::io::Read;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use ringmpmc::Ring;
use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, error, warn};

use super::{is_transient, DEFAULT_RECV_BUFFER, MAX_DATAGRAM, RECV_TIMEOUT};
use crate::codec::HEADER_LEN;
use crate::error::StartupError;
use crate::shutdown::Shutdown;
use crate::stats::Stats;

/// Listen backlog for the accept socket.
const BACKLOG: i32 = 128;

/// Poll cadence of the non-blocking accept loop.
const ACCEPT_POLL: Duration = Duration::from_millis(50);

/// Outcome of one framed read sequence on a connection.
enum FrameOutcome {
    /// A full frame was enqueued (or dropped on back-pressure).
    Complete,
    /// Peer closed, or shutdown was requested mid-read.
    Closed,
    /// Length prefix out of range; counted as a parse error.
    BadLength(usize),
    /// Persistent socket error; counted as a receive error.
    Failed(std::io::Error),
}

/// A bound stream listener.
pub struct TcpReceiver {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpReceiver {
    /// Creates the listener on `0.0.0.0:port` with backlog [`BACKLOG`].
    pub fn bind(port: u16) -> Result<Self, StartupError> {
        let map_err = |source| StartupError::ListenTcp { port, source };

        let listener = listen_socket(port).map_err(map_err)?;
        let local_addr = listener.local_addr().map_err(map_err)?;

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// The bound address (reports the real port when 0 was requested).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept loop. Runs until shutdown or a persistent listener error.
    pub fn run(&self, ring: &Ring, stats: &Stats, shutdown: &Shutdown) {
        debug!(addr = %self.local_addr, "stream receiver started");
        while !shutdown.is_requested() {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    debug!(%peer, "connection accepted");
                    if let Err(e) = configure_stream(&stream) {
                        warn!(%peer, error = %e, "failed to configure connection");
                        continue;
                    }
                    serve_connection(stream, ring, stats, shutdown);
                    debug!(%peer, "connection closed");
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL);
                }
                Err(e) if is_transient(&e) => {}
                Err(e) => {
                    stats.record_recv_error();
                    error!(error = %e, "accept loop terminating");
                    return;
                }
            }
        }
        debug!("stream receiver stopped");
    }
}

/// Drives the per-connection framer until EOF, shutdown, or an error.
fn serve_connection(mut stream: TcpStream, ring: &Ring, stats: &Stats, shutdown: &Shutdown) {
    let mut body = [0u8; MAX_DATAGRAM];
    loop {
        match read_frame(&mut stream, &mut body, ring, stats, shutdown) {
            FrameOutcome::Complete => {}
            FrameOutcome::Closed => return,
            FrameOutcome::BadLength(total_len) => {
                stats.record_parse_error();
                warn!(total_len, "framing violation, closing connection");
                return;
            }
            FrameOutcome::Failed(e) => {
                stats.record_recv_error();
                error!(error = %e, "connection read failed");
                return;
            }
        }
    }
}

/// ReadLen -> ValidateLen -> ReadBody -> Enqueue.
fn read_frame(
    stream: &mut TcpStream,
    body: &mut [u8; MAX_DATAGRAM],
    ring: &Ring,
    stats: &Stats,
    shutdown: &Shutdown,
) -> FrameOutcome {
    let mut len_buf = [0u8; 4];
    match read_full(stream, &mut len_buf, shutdown) {
        Ok(true) => {}
        Ok(false) => return FrameOutcome::Closed,
        Err(e) => return FrameOutcome::Failed(e),
    }

    let total_len = u32::from_le_bytes(len_buf) as usize;
    if total_len < HEADER_LEN || total_len > MAX_DATAGRAM {
        return FrameOutcome::BadLength(total_len);
    }

    match read_full(stream, &mut body[..total_len], shutdown) {
        Ok(true) => {}
        Ok(false) => return FrameOutcome::Closed,
        Err(e) => return FrameOutcome::Failed(e),
    }

    // The 4 framing bytes count toward wire throughput.
    stats.record_recv(total_len + 4);
    if ring.try_push(&body[..total_len]).is_err() {
        stats.record_drop();
    }
    FrameOutcome::Complete
}

/// Reads exactly `buf.len()` bytes. `Ok(false)` means clean EOF or a
/// shutdown request observed mid-read.
fn read_full(stream: &mut TcpStream, buf: &mut [u8], shutdown: &Shutdown) -> std::io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        if shutdown.is_requested() {
            return Ok(false);
        }
        match stream.read(&mut buf[filled..]) {
            Ok(0) => return Ok(false),
            Ok(n) => filled += n,
            Err(e) if is_transient(&e) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

fn configure_stream(stream: &TcpStream) -> std::io::Result<()> {
    stream.set_nodelay(true)?;
    // Accepted sockets may inherit the listener's non-blocking flag.
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(RECV_TIMEOUT))?;
    Ok(())
}

fn listen_socket(port: u16) -> std::io::Result<TcpListener> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    let _ = socket.set_recv_buffer_size(DEFAULT_RECV_BUFFER);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    socket.bind(&addr.into())?;
    socket.listen(BACKLOG)?;

    let listener: TcpListener = socket.into();
    // Non-blocking accept so the loop can poll the shutdown flag.
    listener.set_nonblocking(true)?;
    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringmpmc::{RingConfig, SLOT_BODY};
    use std::io::Write;

    fn frame(packet: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + packet.len());
        out.extend_from_slice(&(packet.len() as u32).to_le_bytes());
        out.extend_from_slice(packet);
        out
    }

    #[test]
    fn test_framer_two_messages() {
        let receiver = TcpReceiver::bind(0).unwrap();
        let port = receiver.local_addr().port();
        let ring = Ring::new(RingConfig::new(16));
        let stats = Stats::new();
        let shutdown = Shutdown::new();

        let packet = [0x42u8; HEADER_LEN + 4];

        thread::scope(|s| {
            let acceptor = s.spawn(|| receiver.run(&ring, &stats, &shutdown));

            let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
            client.write_all(&frame(&packet)).unwrap();
            client.write_all(&frame(&packet)).unwrap();
            drop(client);

            while stats.snapshot().recv_packets < 2 {
                thread::yield_now();
            }
            shutdown.request();
            acceptor.join().unwrap();
        });

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.recv_packets, 2);
        assert_eq!(snapshot.recv_bytes, 2 * (HEADER_LEN as u64 + 4 + 4));

        let mut buf = [0u8; SLOT_BODY];
        assert_eq!(ring.try_pop(&mut buf), Some(packet.len()));
        assert_eq!(&buf[..packet.len()], &packet);
        assert_eq!(ring.try_pop(&mut buf), Some(packet.len()));
        assert_eq!(ring.try_pop(&mut buf), None);
    }

    #[test]
    fn test_framer_rejects_undersized_length() {
        let receiver = TcpReceiver::bind(0).unwrap();
        let port = receiver.local_addr().port();
        let ring = Ring::new(RingConfig::new(16));
        let stats = Stats::new();
        let shutdown = Shutdown::new();

        thread::scope(|s| {
            let acceptor = s.spawn(|| receiver.run(&ring, &stats, &shutdown));

            // total_len of 8 is below the 32-byte header minimum.
            let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
            client.write_all(&8u32.to_le_bytes()).unwrap();
            client.write_all(&[0u8; 8]).unwrap();

            while stats.snapshot().parse_errors == 0 {
                thread::yield_now();
            }
            shutdown.request();
            acceptor.join().unwrap();
        });

        assert_eq!(stats.snapshot().parse_errors, 1);
        assert!(ring.is_empty());
    }
}
