//! Atomic throughput/error counters and the periodic stats reporter.
//!
//! Producers (receivers) and consumers (processors) update the counters
//! with relaxed ordering - the statistics are advisory and never serialize
//! the hot path. The snapshot swaps each counter to zero individually, so
//! an increment racing the snapshot lands in either that report or the
//! next one, never nowhere; slight skew *across* counters within one
//! snapshot is accepted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Shared counter block. One instance per pipeline, updated from every
/// receiver and processor thread.
#[derive(Debug, Default)]
pub struct Stats {
    recv_packets: AtomicU64,
    recv_bytes: AtomicU64,
    processed: AtomicU64,
    active: AtomicU64,
    parse_errors: AtomicU64,
    recv_errors: AtomicU64,
    drops: AtomicU64,
}

/// Point-in-time counter values taken by [`Stats::snapshot_and_reset`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub recv_packets: u64,
    pub recv_bytes: u64,
    pub processed: u64,
    pub active: u64,
    pub parse_errors: u64,
    pub recv_errors: u64,
    pub drops: u64,
}

impl Stats {
    pub const fn new() -> Self {
        Self {
            recv_packets: AtomicU64::new(0),
            recv_bytes: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            active: AtomicU64::new(0),
            parse_errors: AtomicU64::new(0),
            recv_errors: AtomicU64::new(0),
            drops: AtomicU64::new(0),
        }
    }

    /// One packet received off the wire (`bytes` includes any framing).
    #[inline]
    pub fn record_recv(&self, bytes: usize) {
        self.recv_packets.fetch_add(1, Ordering::Relaxed);
        self.recv_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// One packet decoded and run through VAD.
    #[inline]
    pub fn record_processed(&self, active: bool) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        if active {
            self.active.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// One packet that failed to decode (or a framing violation).
    #[inline]
    pub fn record_parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// One persistent receive failure.
    #[inline]
    pub fn record_recv_error(&self) {
        self.recv_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// One packet dropped on back-pressure (ring full or oversize).
    #[inline]
    pub fn record_drop(&self) {
        self.drops.fetch_add(1, Ordering::Relaxed);
    }

    /// Atomically exchanges every counter to zero and returns the values.
    ///
    /// Per-counter atomic: each value is accounted to exactly one snapshot.
    pub fn snapshot_and_reset(&self) -> StatsSnapshot {
        StatsSnapshot {
            recv_packets: self.recv_packets.swap(0, Ordering::Relaxed),
            recv_bytes: self.recv_bytes.swap(0, Ordering::Relaxed),
            processed: self.processed.swap(0, Ordering::Relaxed),
            active: self.active.swap(0, Ordering::Relaxed),
            parse_errors: self.parse_errors.swap(0, Ordering::Relaxed),
            recv_errors: self.recv_errors.swap(0, Ordering::Relaxed),
            drops: self.drops.swap(0, Ordering::Relaxed),
        }
    }

    /// Non-destructive read, for tests and shutdown assertions.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            recv_packets: self.recv_packets.load(Ordering::Relaxed),
            recv_bytes: self.recv_bytes.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            active: self.active.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            recv_errors: self.recv_errors.load(Ordering::Relaxed),
            drops: self.drops.load(Ordering::Relaxed),
        }
    }
}

/// Minimum elapsed time used for rate division, to keep an early report
/// from dividing by ~zero.
const MIN_ELAPSED: Duration = Duration::from_millis(1);

/// Periodic snapshot-and-report driver. Owned by processor 0; everyone
/// else only touches the counters.
///
/// The emitted line is a stable machine interface and goes to stdout:
///
/// ```text
/// [STATS] UDP: 12000 pps, 49.15 Mbps | VAD: 11990 proc/s, 420 active | errors: parse=0 recv=0 drops=0
/// ```
pub struct Reporter {
    transport: &'static str,
    interval: Duration,
    last: Instant,
}

impl Reporter {
    /// `interval` of zero disables reporting entirely.
    pub fn new(transport: &'static str, interval: Duration) -> Self {
        Self {
            transport,
            interval,
            last: Instant::now(),
        }
    }

    /// Checks the monotonic clock; emits one line when the interval has
    /// elapsed. Called once per processor iteration.
    pub fn maybe_report(&mut self, stats: &Stats) {
        if self.interval.is_zero() {
            return;
        }
        let elapsed = self.last.elapsed();
        if elapsed < self.interval {
            return;
        }
        self.last = Instant::now();
        let snapshot = stats.snapshot_and_reset();
        println!("{}", render(self.transport, &snapshot, elapsed));
    }

    /// Final flush on shutdown: reports whatever accumulated since the last
    /// line, if anything did.
    pub fn flush(&mut self, stats: &Stats) {
        if self.interval.is_zero() {
            return;
        }
        let elapsed = self.last.elapsed();
        let snapshot = stats.snapshot_and_reset();
        if snapshot == StatsSnapshot::default() {
            return;
        }
        println!("{}", render(self.transport, &snapshot, elapsed));
    }
}

/// Renders one stats line. Rates carry zero decimals except Mbps (two);
/// `active` and the error fields are absolute counts.
fn render(transport: &str, snapshot: &StatsSnapshot, elapsed: Duration) -> String {
    let secs = elapsed.max(MIN_ELAPSED).as_secs_f64();
    let pps = snapshot.recv_packets as f64 / secs;
    let mbps = (snapshot.recv_bytes as f64 * 8.0) / secs / 1_000_000.0;
    let proc_s = snapshot.processed as f64 / secs;

    format!(
        "[STATS] {transport}: {pps:.0} pps, {mbps:.2} Mbps | VAD: {proc_s:.0} proc/s, {active} active | errors: parse={parse} recv={recv} drops={drops}",
        active = snapshot.active,
        parse = snapshot.parse_errors,
        recv = snapshot.recv_errors,
        drops = snapshot.drops,
    )
}
