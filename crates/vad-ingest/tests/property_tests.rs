//! Property-based tests for the wire codec and the VAD kernel.

use proptest::prelude::*;
use vad_ingest::codec::{self, ParseError, HEADER_LEN, MAX_PAYLOAD};
use vad_ingest::vad::{self, VadKind, EMOTION_CHANNELS};
use vad_ingest::SensorPacket;

fn encode_vec(
    sensor_id: u32,
    timestamp_us: u64,
    data_type: u8,
    seq: u64,
    payload: &[u8],
) -> Vec<u8> {
    let mut buf = vec![0u8; codec::encoded_len(payload.len())];
    let n = codec::encode_into(&mut buf, sensor_id, timestamp_us, data_type, seq, payload)
        .expect("payload within bounds");
    buf.truncate(n);
    buf
}

proptest! {
    /// Every field survives an encode/decode cycle bit-for-bit.
    #[test]
    fn prop_decode_roundtrip(
        sensor_id in any::<u32>(),
        timestamp_us in any::<u64>(),
        data_type in any::<u8>(),
        seq in any::<u64>(),
        payload in prop::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD),
    ) {
        let bytes = encode_vec(sensor_id, timestamp_us, data_type, seq, &payload);
        let packet = codec::decode(&bytes).expect("well-formed packet");

        prop_assert_eq!(packet.sensor_id, sensor_id);
        prop_assert_eq!(packet.timestamp_us, timestamp_us);
        prop_assert_eq!(packet.data_type, data_type);
        prop_assert_eq!(packet.seq, seq);
        prop_assert_eq!(packet.payload, &payload[..]);
    }
}

proptest! {
    /// Anything shorter than the header is rejected, whatever the bytes.
    #[test]
    fn prop_decode_rejects_short_input(
        bytes in prop::collection::vec(any::<u8>(), 0..HEADER_LEN),
    ) {
        prop_assert_eq!(
            codec::decode(&bytes),
            Err(ParseError::ShortHeader(bytes.len()))
        );
    }
}

proptest! {
    /// A declared payload longer than what is present is rejected, never
    /// silently truncated.
    #[test]
    fn prop_decode_rejects_truncation(
        payload in prop::collection::vec(any::<u8>(), 1..=256),
        cut in 1usize..=256,
    ) {
        let bytes = encode_vec(1, 2, 1, 3, &payload);
        let cut = cut.min(payload.len());
        let truncated = &bytes[..bytes.len() - cut];

        prop_assert_eq!(
            codec::decode(truncated),
            Err(ParseError::Truncated {
                declared: payload.len(),
                present: payload.len() - cut,
            })
        );
    }
}

proptest! {
    /// A declared length beyond the maximum is rejected even when that
    /// many bytes are actually present.
    #[test]
    fn prop_decode_rejects_oversized_declaration(
        declared in (MAX_PAYLOAD as u16 + 1)..=u16::MAX,
    ) {
        let mut bytes = vec![0u8; HEADER_LEN + usize::from(declared)];
        bytes[16..18].copy_from_slice(&declared.to_le_bytes());
        prop_assert_eq!(
            codec::decode(&bytes),
            Err(ParseError::PayloadTooLarge(usize::from(declared)))
        );
    }
}

proptest! {
    /// Affect axes stay in [0, 1] for arbitrary finite channel values.
    #[test]
    fn prop_emotional_axes_clamped(
        channels in prop::array::uniform10(-1000.0f32..1000.0),
    ) {
        let payload: Vec<u8> = channels.iter().flat_map(|c| c.to_le_bytes()).collect();
        assert_eq!(payload.len(), EMOTION_CHANNELS * 4);

        let packet = SensorPacket {
            sensor_id: 1,
            timestamp_us: 0,
            data_type: vad::DATA_TYPE_EMOTIONAL,
            seq: 0,
            payload: &payload,
        };
        let result = vad::compute(&packet);
        match result.kind {
            VadKind::Emotional { valence, arousal, dominance } => {
                for axis in [valence, arousal, dominance] {
                    prop_assert!((0.0..=1.0).contains(&axis), "axis {axis} out of range");
                }
            }
            VadKind::Audio { .. } => prop_assert!(false, "wrong kind"),
        }
    }
}

proptest! {
    /// Audio energy is never negative and scales with a constant amplitude.
    #[test]
    fn prop_audio_energy_matches_constant_amplitude(
        amplitude in 0i16..=i16::MAX,
        count in 1usize..64,
    ) {
        let payload: Vec<u8> = std::iter::repeat(amplitude)
            .take(count)
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let packet = SensorPacket {
            sensor_id: 1,
            timestamp_us: 0,
            data_type: vad::DATA_TYPE_AUDIO,
            seq: 0,
            payload: &payload,
        };
        let result = vad::compute(&packet);
        match result.kind {
            VadKind::Audio { energy, .. } => {
                // RMS of a constant signal is the amplitude itself.
                let expected = f64::from(amplitude);
                prop_assert!((energy - expected).abs() < 1e-6,
                    "energy {energy} != amplitude {expected}");
                prop_assert_eq!(result.is_active, energy > vad::AUDIO_ACTIVE_THRESHOLD);
            }
            VadKind::Emotional { .. } => prop_assert!(false, "wrong kind"),
        }
    }
}
