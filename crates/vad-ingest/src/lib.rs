//! High-throughput sensor ingestion pipeline with VAD.
//!
//! Binary sensor packets arrive over exactly one transport per process
//! invocation - UDP datagrams across port-sharing sockets, length-prefixed
//! TCP frames, or an MQTT subscription - and land as raw bytes in a shared
//! lock-free MPMC ring ([`ringmpmc`]). A pool of processor threads drains
//! the ring, decodes the 32-byte-header wire format, runs the VAD kernel,
//! and feeds an atomic stats block that a single designated processor
//! reports at a fixed cadence.
//!
//! ```text
//!  UDP workers ──┐
//!  TCP framer  ──┼──> MPMC ring ──> processors ──> [STATS] line
//!  MQTT loop   ──┘    (bytes)       (decode+VAD)
//! ```
//!
//! The pipeline is assembled by [`Pipeline::bind`] and driven by
//! [`Pipeline::run`]; everything in between is non-blocking and
//! allocation-free.

pub mod codec;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod processor;
pub mod shutdown;
pub mod stats;
pub mod transport;
pub mod vad;

pub use codec::{decode, ParseError, SensorPacket, HEADER_LEN, MAX_PAYLOAD};
pub use config::{Config, Transport};
pub use error::StartupError;
pub use pipeline::Pipeline;
pub use shutdown::Shutdown;
pub use stats::{Reporter, Stats, StatsSnapshot};
pub use vad::{VadKind, VadResult};
