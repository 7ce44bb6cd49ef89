//! Startup error taxonomy.
//!
//! Only startup failures are fatal: bind/listen failures, broker connect
//! failures, and invalid configuration exit the process non-zero.
//! Per-packet errors (parse, drop) and per-socket receive errors are
//! counted in [`Stats`](crate::Stats) and never propagate here.

use std::io;
use thiserror::Error;

/// Fatal errors raised while bringing the pipeline up.
#[derive(Debug, Error)]
pub enum StartupError {
    /// A datagram socket could not be created or bound.
    #[error("failed to bind UDP socket on port {port}: {source}")]
    BindUdp {
        port: u16,
        #[source]
        source: io::Error,
    },

    /// The stream listener could not be created, bound, or put to listen.
    #[error("failed to listen on TCP port {port}: {source}")]
    ListenTcp {
        port: u16,
        #[source]
        source: io::Error,
    },

    /// The broker rejected or never completed the initial connection.
    #[error("failed to connect to MQTT broker at {host}:{port}: {source}")]
    BrokerConnect {
        host: String,
        port: u16,
        #[source]
        source: rumqttc::ConnectionError,
    },

    /// Configuration rejected before any resource was acquired.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
