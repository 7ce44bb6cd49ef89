//! Transport receivers.
//!
//! Three concrete producers share the ring's `try_push` contract: datagram
//! workers ([`udp`]), a length-prefixed stream accept loop ([`tcp`]), and a
//! broker subscription ([`mqtt`]). Dispatch happens once at spawn time -
//! there is no trait object on the hot path.

pub mod mqtt;
pub mod tcp;
pub mod udp;

use std::io;
use std::time::Duration;

/// Largest datagram (and largest stream frame) accepted off the wire.
pub const MAX_DATAGRAM: usize = 65_535;

/// Socket receive buffer requested for every receiver (best effort).
pub const DEFAULT_RECV_BUFFER: usize = 4 << 20;

/// Blocking-receive timeout; bounds how long a receiver can go without
/// observing the shutdown flag.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// Errors that a receive loop retries silently.
pub(crate) fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
