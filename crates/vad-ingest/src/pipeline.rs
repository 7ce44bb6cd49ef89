//! Pipeline assembly: the ownership anchor for ring, stats, and sockets.
//!
//! [`Pipeline::bind`] acquires every startup resource (so startup failures
//! surface before any thread exists); [`Pipeline::run`] spawns receivers
//! and processors inside a [`std::thread::scope`], which hands out
//! non-owning borrows and guarantees teardown after all loops join - no
//! reference counting on the hot path.

use std::net::SocketAddr;
use std::thread;
use std::time::Duration;

use ringmpmc::{Ring, RingConfig};
use tracing::info;

use crate::config::{Config, Transport};
use crate::error::StartupError;
use crate::processor;
use crate::shutdown::Shutdown;
use crate::stats::{Reporter, Stats};
use crate::transport::{mqtt::MqttReceiver, tcp::TcpReceiver, udp::UdpReceiver};

/// Poll cadence of the MQTT stop-watcher thread.
const STOP_POLL: Duration = Duration::from_millis(100);

enum BoundReceiver {
    Udp(UdpReceiver),
    Tcp(TcpReceiver),
    Mqtt(MqttReceiver),
}

/// A fully-constructed ingestion pipeline, ready to run.
pub struct Pipeline {
    config: Config,
    ring: Ring,
    stats: Stats,
    receiver: BoundReceiver,
}

impl Pipeline {
    /// Validates the configuration and acquires sockets and the ring.
    ///
    /// Bind and allocation failures are fatal here; the broker connection
    /// is established lazily and surfaces in [`Pipeline::run`].
    pub fn bind(config: Config) -> Result<Self, StartupError> {
        config.validate()?;

        let receiver = match config.transport {
            Transport::Udp => {
                BoundReceiver::Udp(UdpReceiver::bind(config.port, config.recv_threads)?)
            }
            Transport::Tcp => BoundReceiver::Tcp(TcpReceiver::bind(config.port)?),
            Transport::Mqtt => BoundReceiver::Mqtt(MqttReceiver::new(
                &config.mqtt_host,
                config.mqtt_port,
                &config.mqtt_topic,
            )),
        };

        let ring = Ring::new(RingConfig::new(config.ring_cap));
        info!(
            transport = config.transport.label(),
            ring_capacity = ring.capacity(),
            proc_threads = config.proc_threads,
            "pipeline bound"
        );

        Ok(Self {
            config,
            ring,
            stats: Stats::new(),
            receiver,
        })
    }

    /// The receiver's bound socket address (None for the broker transport).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.receiver {
            BoundReceiver::Udp(udp) => Some(udp.local_addr()),
            BoundReceiver::Tcp(tcp) => Some(tcp.local_addr()),
            BoundReceiver::Mqtt(_) => None,
        }
    }

    /// Counter block shared by all pipeline threads.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Runs receivers and processors until `shutdown` is requested.
    ///
    /// Blocks the calling thread. Returns `Err` only for a fatal broker
    /// connect failure at startup; receiver threads that die later leave
    /// the rest of the pipeline running.
    pub fn run(&self, shutdown: &Shutdown) -> Result<(), StartupError> {
        let ring = &self.ring;
        let stats = &self.stats;
        let label = self.config.transport.label();
        let interval = Duration::from_secs(self.config.stats_interval);
        let proc_threads = self.config.proc_threads;

        thread::scope(|s| {
            for index in 0..proc_threads {
                // Worker 0 is the designated stats owner.
                let reporter = (index == 0).then(|| Reporter::new(label, interval));
                s.spawn(move || processor::run_worker(index, ring, stats, shutdown, reporter));
            }

            match &self.receiver {
                BoundReceiver::Udp(udp) => {
                    for index in 0..udp.socket_count() {
                        s.spawn(move || udp.run_worker(index, ring, stats, shutdown));
                    }
                    Ok(())
                }
                BoundReceiver::Tcp(tcp) => {
                    s.spawn(move || tcp.run(ring, stats, shutdown));
                    Ok(())
                }
                BoundReceiver::Mqtt(mqtt) => {
                    // Stop via the client library's primitive once the
                    // shutdown flag flips.
                    let stopper = mqtt.stopper();
                    s.spawn(move || {
                        while !shutdown.is_requested() {
                            thread::sleep(STOP_POLL);
                        }
                        stopper.stop();
                    });

                    // The event loop runs inline on the calling thread. A
                    // fatal startup error must still release the scope, so
                    // request shutdown before propagating it.
                    let result = mqtt.run(ring, stats, shutdown);
                    if result.is_err() {
                        shutdown.request();
                    }
                    result
                }
            }
        })
    }
}
