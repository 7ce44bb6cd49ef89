//! Broker subscriber: a callback-driven MQTT consumer.
//!
//! Subscribes to the configured topic at QoS 0 once the broker confirms
//! the connection, then copies every publish payload into the ring. For
//! this transport the payload IS the wire packet (32-byte header +
//! payload) with no outer framing.
//!
//! Reconnection after a successful startup is owned by the client library;
//! this module only backs off between its reconnect attempts. A failure
//! before the first `ConnAck` is a fatal startup error.

use std::sync::Mutex;
use std::time::Duration;

use ringmpmc::Ring;
use rumqttc::{Client, Connection, Event, MqttOptions, Packet, QoS};
use tracing::{debug, info, warn};

use crate::error::StartupError;
use crate::shutdown::Shutdown;
use crate::stats::Stats;

/// Fixed client id presented to the broker.
const CLIENT_ID: &str = "vad-ingest";

/// Keep-alive interval requested from the broker.
const KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Pause between event-loop errors after a successful startup.
const RECONNECT_PAUSE: Duration = Duration::from_secs(1);

/// Event-loop request queue depth.
const REQUEST_CAP: usize = 64;

/// A configured (not yet connected) broker subscription.
///
/// The event-loop connection sits behind a mutex only so [`run`] can take
/// `&self` like the socket receivers; exactly one thread ever locks it.
///
/// [`run`]: MqttReceiver::run
pub struct MqttReceiver {
    client: Client,
    connection: Mutex<Connection>,
    host: String,
    port: u16,
    topic: String,
}

/// Handle that stops the subscriber's network loop from another thread.
#[derive(Clone)]
pub struct MqttStopper {
    client: Client,
}

impl MqttStopper {
    /// Asks the client library to disconnect; the event loop drains and
    /// the subscriber's `run` returns.
    pub fn stop(&self) {
        let _ = self.client.disconnect();
    }
}

impl MqttReceiver {
    /// Prepares the client. The TCP connection is established lazily by
    /// the event loop, so errors surface on the first `run` iteration.
    pub fn new(host: &str, port: u16, topic: &str) -> Self {
        let mut options = MqttOptions::new(CLIENT_ID, host, port);
        options.set_keep_alive(KEEP_ALIVE);
        options.set_clean_session(true);

        let (client, connection) = Client::new(options, REQUEST_CAP);
        Self {
            client,
            connection: Mutex::new(connection),
            host: host.to_string(),
            port,
            topic: topic.to_string(),
        }
    }

    /// Returns a handle that can stop the network loop.
    pub fn stopper(&self) -> MqttStopper {
        MqttStopper {
            client: self.client.clone(),
        }
    }

    /// Event loop: subscribe on connect, push publishes into the ring.
    ///
    /// Returns `Err` only when the broker cannot be reached at startup
    /// (before the first `ConnAck`); later connection errors are counted
    /// and retried by the library.
    pub fn run(
        &self,
        ring: &Ring,
        stats: &Stats,
        shutdown: &Shutdown,
    ) -> Result<(), StartupError> {
        let mut connection = self.connection.lock().expect("connection mutex poisoned");
        let mut connected_once = false;

        for event in connection.iter() {
            if shutdown.is_requested() {
                break;
            }
            match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    connected_once = true;
                    info!(host = %self.host, port = self.port, topic = %self.topic,
                        "connected to broker, subscribing");
                    if let Err(e) = self.client.subscribe(self.topic.as_str(), QoS::AtMostOnce) {
                        stats.record_recv_error();
                        warn!(error = %e, "subscribe request failed");
                    }
                }
                Ok(Event::Incoming(Packet::SubAck(_))) => {
                    info!(topic = %self.topic, "subscription confirmed");
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    stats.record_recv(publish.payload.len());
                    if ring.try_push(&publish.payload).is_err() {
                        stats.record_drop();
                    }
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    debug!("broker sent disconnect");
                }
                Ok(_) => {}
                Err(e) if !connected_once => {
                    return Err(StartupError::BrokerConnect {
                        host: self.host.clone(),
                        port: self.port,
                        source: e,
                    });
                }
                Err(e) => {
                    stats.record_recv_error();
                    warn!(error = %e, "broker connection error, awaiting reconnect");
                    std::thread::sleep(RECONNECT_PAUSE);
                }
            }
        }

        debug!("broker subscriber stopped");
        Ok(())
    }
}
