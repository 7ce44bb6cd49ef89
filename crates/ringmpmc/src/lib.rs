//! ringmpmc - Lock-Free Multi-Producer Multi-Consumer Byte Ring
//!
//! A bounded MPMC ring of fixed-size byte slots, built to decouple network
//! receiver threads from processing threads without any lock on the hot
//! path. Producers reserve a slot by CAS on an unbounded `head` counter,
//! fill it, and publish it with a per-slot readiness flag; consumers claim
//! slots by CAS on `tail` and copy the payload out.
//!
//! # Key Features
//!
//! - Cache-line-padded head/tail counters (no false sharing)
//! - Per-slot publish flag (resolves the reservation-order vs
//!   write-completion race among producers)
//! - Zero allocation after construction; payloads are copied, never boxed
//! - Non-blocking push/pop: `Full` and empty are immediate, back-pressure is
//!   the caller's policy
//!
//! # Example
//!
//! ```
//! use ringmpmc::{Ring, RingConfig, SLOT_BODY};
//!
//! let ring = Ring::new(RingConfig::new(1024));
//! ring.try_push(b"sensor bytes").unwrap();
//!
//! let mut buf = [0u8; SLOT_BODY];
//! let len = ring.try_pop(&mut buf).unwrap();
//! assert_eq!(&buf[..len], b"sensor bytes");
//! ```

mod backoff;
mod config;
mod error;
mod invariants;
mod ring;

pub use backoff::Backoff;
pub use config::{RingConfig, DEFAULT_CAPACITY, MAX_CAPACITY};
pub use error::PushError;
pub use ring::{Ring, SLOT_BODY, SLOT_SIZE};
