//! Processor pool: drains the ring, decodes, runs VAD, updates stats.
//!
//! Processors never block on I/O and never allocate: the pop buffer and
//! the decoded packet both live on the worker's stack. A parse error is
//! counted and the loop continues; nothing a peer sends can terminate a
//! processor. Worker 0 additionally owns the stats reporter.

use ringmpmc::{Backoff, Ring, SLOT_BODY};
use tracing::debug;

use crate::codec;
use crate::shutdown::Shutdown;
use crate::stats::{Reporter, Stats};
use crate::vad;

/// One processor worker loop. Runs until shutdown.
///
/// `reporter` is `Some` only for worker 0, the designated stats owner.
pub fn run_worker(
    index: usize,
    ring: &Ring,
    stats: &Stats,
    shutdown: &Shutdown,
    mut reporter: Option<Reporter>,
) {
    let mut buf = [0u8; SLOT_BODY];
    let mut backoff = Backoff::new();

    debug!(index, "processor started");
    while !shutdown.is_requested() {
        match ring.try_pop(&mut buf) {
            Some(len) => {
                backoff.reset();
                handle_payload(&buf[..len], stats);
            }
            None => backoff.snooze(),
        }

        if let Some(reporter) = reporter.as_mut() {
            reporter.maybe_report(stats);
        }
    }

    // Optional final flush: whatever accumulated since the last line.
    if let Some(reporter) = reporter.as_mut() {
        reporter.flush(stats);
    }
    debug!(index, "processor stopped");
}

#[inline]
fn handle_payload(payload: &[u8], stats: &Stats) {
    match codec::decode(payload) {
        Ok(packet) => {
            let result = vad::compute(&packet);
            stats.record_processed(result.is_active);
        }
        Err(_) => stats.record_parse_error(),
    }
}
