//! Traffic generator for exercising the ingestion pipeline.
//!
//! Encodes audio or emotional sensor packets and sends them over UDP
//! datagrams or length-prefixed TCP frames at a configurable rate.

use std::io::Write;
use std::net::{SocketAddr, TcpStream, UdpSocket};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use rand::Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vad_ingest::codec;
use vad_ingest::vad::{DATA_TYPE_AUDIO, DATA_TYPE_EMOTIONAL, EMOTION_CHANNELS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Proto {
    Udp,
    Tcp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Kind {
    Audio,
    Emotional,
}

#[derive(Debug, Parser)]
#[command(name = "packet-generator")]
#[command(about = "Generates sensor packet traffic for the ingestion pipeline")]
struct Args {
    /// Wire protocol to send over.
    #[arg(long, value_enum, default_value_t = Proto::Udp)]
    proto: Proto,

    /// Pipeline address.
    #[arg(long, default_value = "127.0.0.1:9000")]
    target: SocketAddr,

    /// Packet kind to generate.
    #[arg(long, value_enum, default_value_t = Kind::Audio)]
    kind: Kind,

    /// Packets per second (0 = unthrottled).
    #[arg(long, default_value_t = 10_000)]
    rate: u64,

    /// Total packets to send.
    #[arg(long, default_value_t = 100_000)]
    count: u64,

    /// Audio samples per packet.
    #[arg(long, default_value_t = 160)]
    samples: usize,

    /// Peak audio amplitude (samples drawn uniformly from +/- this value).
    #[arg(long, default_value_t = 1000)]
    amplitude: i16,

    /// Sensor id stamped on every packet.
    #[arg(long, default_value_t = 1)]
    sensor_id: u32,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut rng = rand::thread_rng();
    let mut payload = vec![0u8; codec::MAX_PAYLOAD];
    let mut packet = vec![0u8; codec::encoded_len(codec::MAX_PAYLOAD)];

    let mut sink = match args.proto {
        Proto::Udp => {
            let socket = UdpSocket::bind("0.0.0.0:0").context("binding sender socket")?;
            socket.connect(args.target).context("connecting sender socket")?;
            Sink::Udp(socket)
        }
        Proto::Tcp => {
            let stream = TcpStream::connect(args.target).context("connecting to pipeline")?;
            stream.set_nodelay(true)?;
            Sink::Tcp(stream)
        }
    };

    let pacing = (args.rate > 0).then(|| Duration::from_secs(1).div_f64(args.rate as f64));
    let started = Instant::now();
    let mut sent_bytes = 0u64;

    for seq in 0..args.count {
        let payload_len = match args.kind {
            Kind::Audio => fill_audio(&mut payload, args.samples, args.amplitude, &mut rng),
            Kind::Emotional => fill_emotional(&mut payload, &mut rng),
        };

        let data_type = match args.kind {
            Kind::Audio => DATA_TYPE_AUDIO,
            Kind::Emotional => DATA_TYPE_EMOTIONAL,
        };
        let timestamp_us = started.elapsed().as_micros() as u64;
        let total = codec::encode_into(
            &mut packet,
            args.sensor_id,
            timestamp_us,
            data_type,
            seq,
            &payload[..payload_len],
        )
        .context("packet encoding failed")?;

        sink.send(&packet[..total])?;
        sent_bytes += total as u64;

        if let Some(gap) = pacing {
            // Coarse pacing: sleep toward the ideal send time.
            let ideal = gap.mul_f64(seq as f64 + 1.0);
            let elapsed = started.elapsed();
            if ideal > elapsed {
                thread::sleep(ideal - elapsed);
            }
        }
    }

    let secs = started.elapsed().as_secs_f64().max(0.001);
    info!(
        "sent {} packets ({:.2} Mbps, {:.0} pps)",
        args.count,
        sent_bytes as f64 * 8.0 / secs / 1_000_000.0,
        args.count as f64 / secs,
    );
    Ok(())
}

enum Sink {
    Udp(UdpSocket),
    Tcp(TcpStream),
}

impl Sink {
    fn send(&mut self, packet: &[u8]) -> anyhow::Result<()> {
        match self {
            Self::Udp(socket) => {
                socket.send(packet).context("datagram send failed")?;
            }
            Self::Tcp(stream) => {
                // Stream transport prefixes each packet with u32 LE length.
                stream
                    .write_all(&(packet.len() as u32).to_le_bytes())
                    .context("frame prefix write failed")?;
                stream.write_all(packet).context("frame body write failed")?;
            }
        }
        Ok(())
    }
}

fn fill_audio(buf: &mut [u8], samples: usize, amplitude: i16, rng: &mut impl Rng) -> usize {
    let samples = samples.min(buf.len() / 2).min(codec::MAX_PAYLOAD / 2);
    for i in 0..samples {
        let s: i16 = rng.gen_range(-amplitude..=amplitude);
        buf[i * 2..i * 2 + 2].copy_from_slice(&s.to_le_bytes());
    }
    samples * 2
}

fn fill_emotional(buf: &mut [u8], rng: &mut impl Rng) -> usize {
    for i in 0..EMOTION_CHANNELS {
        let c: f32 = rng.gen_range(0.0..1.0);
        buf[i * 4..i * 4 + 4].copy_from_slice(&c.to_le_bytes());
    }
    EMOTION_CHANNELS * 4
}
