//! Pipeline configuration and CLI surface.

use clap::{Parser, ValueEnum};

use crate::error::StartupError;

/// Upper bound on datagram receiver threads.
pub const MAX_RECV_THREADS: usize = 32;

/// Upper bound on processor threads.
pub const MAX_PROC_THREADS: usize = 16;

/// Which receiver feeds the ring. Exactly one per process invocation, so
/// back-pressure, drops, and CPU cost are attributable to that transport
/// alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    Udp,
    Tcp,
    Mqtt,
}

impl Transport {
    /// Stable label used in the `[STATS]` line.
    pub fn label(self) -> &'static str {
        match self {
            Self::Udp => "UDP",
            Self::Tcp => "TCP",
            Self::Mqtt => "MQTT",
        }
    }
}

/// Ingestion pipeline configuration (doubles as the CLI definition).
#[derive(Debug, Clone, Parser)]
#[command(name = "vad-ingest")]
#[command(about = "High-throughput sensor ingestion pipeline with VAD")]
#[command(version)]
pub struct Config {
    /// Transport to ingest from.
    #[arg(long, value_enum, default_value_t = Transport::Udp)]
    pub transport: Transport,

    /// Port for the datagram/stream receivers (0 picks an ephemeral port).
    #[arg(long, default_value_t = 9000)]
    pub port: u16,

    /// MQTT broker host.
    #[arg(long, default_value = "127.0.0.1")]
    pub mqtt_host: String,

    /// MQTT broker port.
    #[arg(long, default_value_t = 1883)]
    pub mqtt_port: u16,

    /// MQTT subscription topic (single-level wildcard selects all sensors).
    #[arg(long, default_value = "vad/sensors/+")]
    pub mqtt_topic: String,

    /// Datagram receiver threads (honored for UDP only).
    #[arg(long, default_value_t = 4)]
    pub recv_threads: usize,

    /// Processor threads.
    #[arg(long, default_value_t = 2)]
    pub proc_threads: usize,

    /// Ring capacity in slots; rounded up to the next power of two.
    #[arg(long, default_value_t = 262_144)]
    pub ring_cap: usize,

    /// Seconds between stats lines (0 disables reporting).
    #[arg(long, default_value_t = 5)]
    pub stats_interval: u64,

    /// Log level for diagnostics (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Validates thread counts and capacity before any resource is
    /// acquired.
    pub fn validate(&self) -> Result<(), StartupError> {
        if self.recv_threads == 0 || self.recv_threads > MAX_RECV_THREADS {
            return Err(StartupError::InvalidConfig(format!(
                "recv-threads must be between 1 and {MAX_RECV_THREADS}, got {}",
                self.recv_threads
            )));
        }
        if self.proc_threads == 0 || self.proc_threads > MAX_PROC_THREADS {
            return Err(StartupError::InvalidConfig(format!(
                "proc-threads must be between 1 and {MAX_PROC_THREADS}, got {}",
                self.proc_threads
            )));
        }
        if self.ring_cap == 0 {
            return Err(StartupError::InvalidConfig(
                "ring-cap must be non-zero".into(),
            ));
        }
        if self.mqtt_topic.is_empty() {
            return Err(StartupError::InvalidConfig(
                "mqtt-topic must be non-empty".into(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: Transport::Udp,
            port: 9000,
            mqtt_host: "127.0.0.1".into(),
            mqtt_port: 1883,
            mqtt_topic: "vad/sensors/+".into(),
            recv_threads: 4,
            proc_threads: 2,
            ring_cap: 262_144,
            stats_interval: 5,
            log_level: "info".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, 9000);
        assert_eq!(config.recv_threads, 4);
        assert_eq!(config.proc_threads, 2);
        assert_eq!(config.ring_cap, 262_144);
        assert_eq!(config.stats_interval, 5);
    }

    #[test]
    fn test_cli_parsing_matches_defaults() {
        let config = Config::parse_from(["vad-ingest"]);
        assert_eq!(config.transport, Transport::Udp);
        assert_eq!(config.mqtt_topic, "vad/sensors/+");
    }

    #[test]
    fn test_cli_overrides() {
        let config = Config::parse_from([
            "vad-ingest",
            "--transport",
            "tcp",
            "--port",
            "7777",
            "--proc-threads",
            "8",
        ]);
        assert_eq!(config.transport, Transport::Tcp);
        assert_eq!(config.port, 7777);
        assert_eq!(config.proc_threads, 8);
    }

    #[test]
    fn test_thread_bounds_rejected() {
        let mut config = Config::default();
        config.recv_threads = 0;
        assert!(config.validate().is_err());

        config.recv_threads = MAX_RECV_THREADS + 1;
        assert!(config.validate().is_err());

        config.recv_threads = 4;
        config.proc_threads = MAX_PROC_THREADS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_transport_labels() {
        assert_eq!(Transport::Udp.label(), "UDP");
        assert_eq!(Transport::Tcp.label(), "TCP");
        assert_eq!(Transport::Mqtt.label(), "MQTT");
    }
}
