//! Debug assertion macros for ring invariants.
//!
//! Active only in debug builds (`debug_assert!`), so there is zero overhead
//! in release builds.

// =============================================================================
// INV-RING-01: Bounded Count
// =============================================================================

/// Assert that occupancy does not exceed capacity.
///
/// **Invariant**: `0 <= (head - tail) <= capacity`
///
/// Used in: `try_push()` after winning the head CAS
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "INV-RING-01 violated: occupancy {} exceeds capacity {}",
            $count,
            $capacity
        )
    };
}

// =============================================================================
// INV-RING-02: Claims never pass reservations
// =============================================================================

/// Assert that the claim counter never advances past the reservation counter.
///
/// **Invariant**: `tail <= head`
///
/// Used in: `try_pop()` after winning the tail CAS
macro_rules! debug_assert_tail_not_past_head {
    ($new_tail:expr, $head:expr) => {
        debug_assert!(
            $new_tail <= $head,
            "INV-RING-02 violated: tail {} advanced past head {}",
            $new_tail,
            $head
        )
    };
}

// =============================================================================
// INV-RING-03: Published length in range
// =============================================================================

/// Assert that a published slot declares a body length within bounds.
///
/// **Invariant**: `ready == 1` implies `len <= SLOT_BODY`
///
/// Used in: `try_pop()` before copying the body out
macro_rules! debug_assert_popped_len {
    ($len:expr, $max:expr) => {
        debug_assert!(
            $len <= $max,
            "INV-RING-03 violated: published slot length {} exceeds body size {}",
            $len,
            $max
        )
    };
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_popped_len;
pub(crate) use debug_assert_tail_not_past_head;
