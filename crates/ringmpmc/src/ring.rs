use crate::invariants::{
    debug_assert_bounded_count, debug_assert_popped_len, debug_assert_tail_not_past_head,
};
use crate::{Backoff, PushError, RingConfig};
use std::cell::UnsafeCell;
use std::ptr;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crossbeam_utils::CachePadded;

/// Total size of one ring slot in bytes. Cache-line multiple.
pub const SLOT_SIZE: usize = 512;

/// Usable payload bytes per slot (slot size minus the 8-byte slot header).
pub const SLOT_BODY: usize = SLOT_SIZE - 8;

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// This MPMC ring buffer coordinates N producers and M consumers with two
// unbounded u64 sequence counters and a per-slot readiness flag:
//
// ## Sequence Numbers (ABA Prevention)
//
// `head` (producer reservations) and `tail` (consumer claims) are unbounded
// u64 sequence numbers, never wrapped indices. With 2^64 values, wrap-around
// is practically impossible; the slot index is `sequence & mask` computed
// only at access time.
//
// ## Why a per-slot `ready` flag
//
// Multiple producers may simultaneously own disjoint slot indices between
// `tail` and `head`. A consumer that only compared `tail < head` could land
// on a slot still being filled by a slower producer that reserved earlier.
// The flag resolves the reservation-order-vs-write-completion race without
// any global lock:
//
// **Producer (push path):**
// 1. Load `head` (Relaxed) and `tail` (Relaxed); full when head - tail >=
//    capacity. A stale tail only under-reports space, never over-reports.
// 2. CAS `head: h -> h+1` (AcqRel on success) to claim slot `h & mask`.
// 3. Wait for `ready == 0` (Acquire) - a consumer one full lap behind may
//    still be copying out of this slot.
// 4. Write `len` and the body bytes (plain stores; the slot is exclusively
//    owned between reservation and publish).
// 5. Store `ready = 1` (Release) - publishes the writes.
//
// **Consumer (pop path):**
// 1. Load `tail` (Relaxed) and `head` (Acquire); empty when tail >= head.
// 2. Load `ready` (Acquire); 0 means the slot is reserved but not yet
//    published - report empty and let the caller back off.
// 3. CAS `tail: t -> t+1` (AcqRel on success) to claim the slot.
// 4. Copy the body bytes out (the Acquire load of `ready` in step 2
//    synchronizes with the producer's Release store, so the data is
//    visible).
// 5. Store `ready = 0` (Release) - returns the slot to producers.
//
// ## Slot exclusivity
//
// `head - tail <= capacity` guarantees each live sequence number maps to a
// distinct slot, and the `ready` handshake in steps P3/C5 keeps a producer
// off a slot until the claiming consumer has finished copying. Each slot's
// `ready` therefore transitions 0 -> 1 -> 0 exactly once per epoch
// (`sequence / capacity`), and a popped `(len, data[..len])` pair always
// matches a single producer's write atomically.
//
// =============================================================================

/// One fixed-size slot: an 8-byte header (`ready` flag + body length) and a
/// `SLOT_BODY`-byte body. `#[repr(C, align(64))]` pins the layout so the
/// whole slot is exactly `SLOT_SIZE` bytes and never straddles an extra
/// cache line.
#[repr(C, align(64))]
struct Slot {
    /// 0 = free, 1 = published. The only cross-thread handshake per slot.
    ready: AtomicU32,
    /// Valid body length. Written before `ready = 1`, read after.
    len: UnsafeCell<u16>,
    /// Payload bytes; `data[..len]` is initialized whenever `ready == 1`.
    data: UnsafeCell<[u8; SLOT_BODY]>,
}

const _: () = assert!(std::mem::size_of::<Slot>() == SLOT_SIZE);
const _: () = assert!(SLOT_SIZE % 64 == 0);

impl Slot {
    fn new() -> Self {
        Self {
            ready: AtomicU32::new(0),
            len: UnsafeCell::new(0),
            data: UnsafeCell::new([0; SLOT_BODY]),
        }
    }
}

/// Bounded lock-free MPMC ring of fixed-size byte slots.
///
/// Producers copy raw wire bytes in with [`Ring::try_push`]; consumers copy
/// them out with [`Ring::try_pop`]. Both sides are non-blocking: `Full` and
/// empty are reported immediately and the ring never overwrites live data.
///
/// `head` and `tail` live on separate cache lines ([`CachePadded`]) so
/// producer and consumer traffic do not false-share.
pub struct Ring {
    /// Reservation counter, advanced by producers.
    head: CachePadded<AtomicU64>,
    /// Claim counter, advanced by consumers.
    tail: CachePadded<AtomicU64>,
    /// Index mask (`capacity - 1`; capacity is a power of two).
    mask: u64,
    /// Fixed at construction.
    ///
    /// `Box<[Slot]>` instead of `Vec<Slot>`: the allocation never grows,
    /// and the boxed slice drops the spare capacity field.
    slots: Box<[Slot]>,
}

// Safety: all cross-thread slot access is mediated by the head/tail CAS
// protocol and the per-slot `ready` handshake documented above.
unsafe impl Send for Ring {}
unsafe impl Sync for Ring {}

impl Ring {
    /// Allocates a ring with the configured (power-of-two) capacity.
    ///
    /// This is the single allocation of the hot path; it happens once at
    /// startup and is released when the ring is dropped.
    pub fn new(config: RingConfig) -> Self {
        let capacity = config.capacity();
        let slots: Box<[Slot]> = (0..capacity).map(|_| Slot::new()).collect();

        Self {
            head: CachePadded::new(AtomicU64::new(0)),
            tail: CachePadded::new(AtomicU64::new(0)),
            mask: (capacity - 1) as u64,
            slots,
        }
    }

    /// Ring capacity in slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Current occupancy (`head - tail`). Relaxed observer; advisory only.
    #[inline]
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        head.wrapping_sub(tail) as usize
    }

    /// Returns true if the ring is observed empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies `data` into the next free slot.
    ///
    /// Non-blocking: returns [`PushError::Full`] immediately when occupancy
    /// equals capacity (the caller records a drop and moves on) and
    /// [`PushError::Oversize`] when `data` cannot fit a slot body. No slot
    /// is mutated on either failure.
    pub fn try_push(&self, data: &[u8]) -> Result<(), PushError> {
        if data.len() > SLOT_BODY {
            return Err(PushError::Oversize {
                len: data.len(),
                max: SLOT_BODY,
            });
        }

        // Reserve a slot index by winning the head CAS.
        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            let tail = self.tail.load(Ordering::Relaxed);
            if head.wrapping_sub(tail) >= self.capacity() as u64 {
                return Err(PushError::Full);
            }
            match self.head.compare_exchange_weak(
                head,
                head.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    // INV-RING-01: occupancy never exceeds capacity
                    debug_assert_bounded_count!(
                        head.wrapping_add(1).wrapping_sub(tail) as usize,
                        self.capacity()
                    );
                    break;
                }
                Err(actual) => head = actual,
            }
        }

        let slot = &self.slots[(head & self.mask) as usize];

        // Slot-reuse barrier: the consumer that claimed this slot one lap
        // ago may still be copying out. Wait for it to release the slot.
        let mut backoff = Backoff::new();
        while slot.ready.load(Ordering::Acquire) != 0 {
            backoff.snooze();
        }

        // SAFETY: the head CAS above granted this thread exclusive write
        // ownership of the slot for sequence `head`, and the reuse barrier
        // confirmed no consumer still reads it. `data.len() <= SLOT_BODY`
        // was checked on entry.
        unsafe {
            *slot.len.get() = data.len() as u16;
            ptr::copy_nonoverlapping(data.as_ptr(), (*slot.data.get()).as_mut_ptr(), data.len());
        }

        // Publish: pairs with the Acquire load of `ready` in try_pop.
        slot.ready.store(1, Ordering::Release);
        Ok(())
    }

    /// Copies the oldest published payload into `out`.
    ///
    /// Returns the payload length, or `None` when the ring is empty or the
    /// next slot is reserved but not yet published (the caller should back
    /// off briefly and retry).
    pub fn try_pop(&self, out: &mut [u8; SLOT_BODY]) -> Option<usize> {
        let mut tail = self.tail.load(Ordering::Relaxed);
        loop {
            let head = self.head.load(Ordering::Acquire);
            if tail >= head {
                return None;
            }

            let slot = &self.slots[(tail & self.mask) as usize];
            if slot.ready.load(Ordering::Acquire) == 0 {
                // Reserved by a producer that has not published yet.
                return None;
            }

            match self.tail.compare_exchange_weak(
                tail,
                tail.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    // INV-RING-02: claims never pass reservations
                    debug_assert_tail_not_past_head!(tail.wrapping_add(1), head);

                    // SAFETY: the tail CAS granted exclusive read ownership
                    // of this slot; the earlier Acquire load of `ready == 1`
                    // synchronizes with the producer's Release publish, so
                    // `len` and `data[..len]` are initialized and visible.
                    let len = unsafe { usize::from(*slot.len.get()) };
                    debug_assert_popped_len!(len, SLOT_BODY);
                    unsafe {
                        ptr::copy_nonoverlapping(
                            (*slot.data.get()).as_ptr(),
                            out.as_mut_ptr(),
                            len,
                        );
                    }

                    // Return the slot to producers. Pairs with the Acquire
                    // load in the push-side reuse barrier.
                    slot.ready.store(0, Ordering::Release);
                    return Some(len);
                }
                Err(actual) => tail = actual,
            }
        }
    }

    /// Pops up to `max` payloads, invoking `handler` for each.
    ///
    /// Convenience wrapper over [`Ring::try_pop`]; it is NOT atomic across
    /// slots - other consumers may interleave between iterations - but each
    /// slot is still claimed exactly once by exactly one consumer.
    pub fn pop_batch<F>(&self, max: usize, mut handler: F) -> usize
    where
        F: FnMut(&[u8]),
    {
        let mut buf = [0u8; SLOT_BODY];
        let mut count = 0;
        while count < max {
            match self.try_pop(&mut buf) {
                Some(len) => {
                    handler(&buf[..len]);
                    count += 1;
                }
                None => break,
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(capacity: usize) -> Ring {
        Ring::new(RingConfig::new(capacity))
    }

    #[test]
    fn test_push_pop_roundtrip() {
        let r = ring(8);
        let mut out = [0u8; SLOT_BODY];

        r.try_push(b"hello").unwrap();
        r.try_push(b"").unwrap();

        assert_eq!(r.len(), 2);
        assert_eq!(r.try_pop(&mut out), Some(5));
        assert_eq!(&out[..5], b"hello");
        assert_eq!(r.try_pop(&mut out), Some(0));
        assert_eq!(r.try_pop(&mut out), None);
        assert!(r.is_empty());
    }

    #[test]
    fn test_fifo_single_producer() {
        let r = ring(64);
        let mut out = [0u8; SLOT_BODY];

        for i in 0u32..50 {
            r.try_push(&i.to_le_bytes()).unwrap();
        }
        for i in 0u32..50 {
            let len = r.try_pop(&mut out).unwrap();
            assert_eq!(len, 4);
            assert_eq!(u32::from_le_bytes([out[0], out[1], out[2], out[3]]), i);
        }
    }

    #[test]
    fn test_full_returns_immediately() {
        let r = ring(4);
        for i in 0u8..4 {
            r.try_push(&[i]).unwrap();
        }
        assert_eq!(r.len(), r.capacity());
        assert_eq!(r.try_push(&[9]), Err(PushError::Full));

        // Occupancy unchanged and existing data intact.
        assert_eq!(r.len(), 4);
        let mut out = [0u8; SLOT_BODY];
        assert_eq!(r.try_pop(&mut out), Some(1));
        assert_eq!(out[0], 0);
    }

    #[test]
    fn test_oversize_rejected_without_reserving() {
        let r = ring(4);
        let big = [0u8; SLOT_BODY + 1];
        assert!(matches!(
            r.try_push(&big),
            Err(PushError::Oversize { len, max }) if len == SLOT_BODY + 1 && max == SLOT_BODY
        ));
        assert!(r.is_empty());

        // A maximal body still fits.
        let exact = [0xABu8; SLOT_BODY];
        r.try_push(&exact).unwrap();
        let mut out = [0u8; SLOT_BODY];
        assert_eq!(r.try_pop(&mut out), Some(SLOT_BODY));
        assert_eq!(out, exact);
    }

    #[test]
    fn test_wraparound_reuses_slots() {
        let r = ring(4);
        let mut out = [0u8; SLOT_BODY];

        // Three full laps.
        for lap in 0u8..3 {
            for i in 0u8..4 {
                r.try_push(&[lap, i]).unwrap();
            }
            for i in 0u8..4 {
                assert_eq!(r.try_pop(&mut out), Some(2));
                assert_eq!(&out[..2], &[lap, i]);
            }
        }
        assert!(r.is_empty());
    }

    #[test]
    fn test_pop_batch_bounded() {
        let r = ring(16);
        for i in 0u8..10 {
            r.try_push(&[i]).unwrap();
        }

        let mut seen = Vec::new();
        let n = r.pop_batch(4, |payload| seen.push(payload[0]));
        assert_eq!(n, 4);
        assert_eq!(seen, vec![0, 1, 2, 3]);

        let n = r.pop_batch(100, |payload| seen.push(payload[0]));
        assert_eq!(n, 6);
        assert_eq!(seen.len(), 10);
    }
}
