//! Error types for ring operations.

use thiserror::Error;

/// Why a push was refused. Both cases are non-blocking: the caller records
/// a drop and continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PushError {
    /// Occupancy equals capacity; the ring never overwrites live data.
    #[error("ring is full")]
    Full,

    /// The payload cannot fit a slot body.
    #[error("payload of {len} bytes exceeds slot body of {max} bytes")]
    Oversize {
        /// Rejected payload length.
        len: usize,
        /// Maximum payload a slot can carry.
        max: usize,
    },
}

impl PushError {
    /// Returns `true` for back-pressure (`Full`), which clears as consumers
    /// drain; `Oversize` never succeeds on retry.
    #[inline]
    pub fn is_backpressure(&self) -> bool {
        matches!(self, Self::Full)
    }
}
