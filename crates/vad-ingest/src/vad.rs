//! VAD kernel: activity detection over a decoded sensor packet.
//!
//! Two packet kinds share the `is_active` contract:
//!
//! - **Audio** (`data_type == 1`, and the fallback for unknown types): the
//!   payload is i16 LE PCM; activity is RMS energy above a fixed threshold.
//! - **Emotional vector** (`data_type == 2`): the payload is ten f32 LE
//!   channels; each affect axis is a clamped linear combination of the
//!   channels, and activity is arousal above a fixed threshold.
//!
//! The kernel is pure and allocation-free. Audio math is f64, emotional
//! math is f32; NaN inputs propagate.

use crate::codec::SensorPacket;

/// RMS energy above which an audio window counts as active (strict `>`).
pub const AUDIO_ACTIVE_THRESHOLD: f64 = 30.0;

/// Arousal above which an emotional window counts as active (strict `>`).
pub const AROUSAL_ACTIVE_THRESHOLD: f32 = 0.35;

/// Channels in an emotional vector payload.
pub const EMOTION_CHANNELS: usize = 10;

const EMOTION_VECTOR_BYTES: usize = EMOTION_CHANNELS * 4;

/// Wire value for audio packets.
pub const DATA_TYPE_AUDIO: u8 = 1;

/// Wire value for emotional vector packets.
pub const DATA_TYPE_EMOTIONAL: u8 = 2;

// Affect weight tables. Channel order: battery_low, people_count,
// known_face, unknown_face, fall_event, lifted, idle_time, sound_energy,
// voice_rate, motion_energy. The trailing constant of each row is the bias.
const VALENCE_WEIGHTS: [f32; EMOTION_CHANNELS] =
    [-0.05, 0.15, 0.30, -0.20, -0.20, -0.15, -0.10, 0.05, 0.15, 0.00];
const VALENCE_BIAS: f32 = 0.30;

const AROUSAL_WEIGHTS: [f32; EMOTION_CHANNELS] =
    [0.00, 0.10, 0.00, 0.10, 0.20, 0.15, -0.25, 0.25, 0.10, 0.25];
const AROUSAL_BIAS: f32 = 0.10;

const DOMINANCE_WEIGHTS: [f32; EMOTION_CHANNELS] =
    [-0.15, 0.10, 0.25, -0.20, -0.15, -0.15, -0.05, 0.05, 0.15, 0.05];
const DOMINANCE_BIAS: f32 = 0.35;

/// Outcome of one VAD computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VadResult {
    pub sensor_id: u32,
    pub seq: u64,
    pub is_active: bool,
    pub kind: VadKind,
}

/// Kind-specific detail of a [`VadResult`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VadKind {
    Audio { energy: f64, threshold: f64 },
    Emotional { valence: f32, arousal: f32, dominance: f32 },
}

/// Runs the VAD computation for one decoded packet.
pub fn compute(packet: &SensorPacket<'_>) -> VadResult {
    match packet.data_type {
        DATA_TYPE_EMOTIONAL => compute_emotional(packet),
        _ => compute_audio(packet),
    }
}

fn compute_audio(packet: &SensorPacket<'_>) -> VadResult {
    let energy = rms_energy(packet.payload);
    VadResult {
        sensor_id: packet.sensor_id,
        seq: packet.seq,
        is_active: energy > AUDIO_ACTIVE_THRESHOLD,
        kind: VadKind::Audio {
            energy,
            threshold: AUDIO_ACTIVE_THRESHOLD,
        },
    }
}

/// RMS over i16 LE samples; an odd trailing byte is ignored. Zero samples
/// means zero energy.
fn rms_energy(payload: &[u8]) -> f64 {
    let n = payload.len() / 2;
    if n == 0 {
        return 0.0;
    }
    let mut sum_sq = 0.0f64;
    for pair in payload.chunks_exact(2) {
        let sample = f64::from(i16::from_le_bytes([pair[0], pair[1]]));
        sum_sq += sample * sample;
    }
    (sum_sq / n as f64).sqrt()
}

fn compute_emotional(packet: &SensorPacket<'_>) -> VadResult {
    let (valence, arousal, dominance) = if packet.payload.len() < EMOTION_VECTOR_BYTES {
        (0.0, 0.0, 0.0)
    } else {
        let mut channels = [0.0f32; EMOTION_CHANNELS];
        for (channel, chunk) in channels
            .iter_mut()
            .zip(packet.payload.chunks_exact(4).take(EMOTION_CHANNELS))
        {
            *channel = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        (
            affect_axis(&channels, &VALENCE_WEIGHTS, VALENCE_BIAS),
            affect_axis(&channels, &AROUSAL_WEIGHTS, AROUSAL_BIAS),
            affect_axis(&channels, &DOMINANCE_WEIGHTS, DOMINANCE_BIAS),
        )
    };

    VadResult {
        sensor_id: packet.sensor_id,
        seq: packet.seq,
        is_active: arousal > AROUSAL_ACTIVE_THRESHOLD,
        kind: VadKind::Emotional {
            valence,
            arousal,
            dominance,
        },
    }
}

#[inline]
fn affect_axis(channels: &[f32; EMOTION_CHANNELS], weights: &[f32; EMOTION_CHANNELS], bias: f32) -> f32 {
    let mut axis = bias;
    for (c, w) in channels.iter().zip(weights) {
        axis += w * c;
    }
    axis.clamp(0.0, 1.0)
}
