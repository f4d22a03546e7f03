//! WAV encoding for emitted speech segments. Grounded on
//! `audio_processor.rs::save_audio_to_wav`'s scaling and spec format, but
//! returns bytes instead of writing straight to a file, since the core must
//! stay agnostic to storage.

use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

/// Encodes `samples` (mono, `[-1.0, 1.0]`-ish f32) as 16-bit PCM WAV bytes at
/// `sample_rate`. Out-of-range samples are clamped rather than rejected,
/// matching sonori's own scale-and-clamp behavior.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            WavWriter::new(&mut cursor, spec).expect("in-memory WAV writer construction cannot fail");
        for &sample in samples {
            let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(scaled)
                .expect("in-memory WAV write cannot fail");
        }
        writer.finalize().expect("in-memory WAV finalize cannot fail");
    }
    cursor.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_non_empty_header_and_data() {
        let samples = vec![0.0f32, 0.5, -0.5, 1.0, -1.0];
        let bytes = encode_wav(&samples, 16_000);
        assert!(bytes.len() > 44); // RIFF header is 44 bytes
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
    }

    #[test]
    fn out_of_range_samples_are_clamped_not_rejected() {
        let samples = vec![2.0f32, -2.0f32];
        let bytes = encode_wav(&samples, 16_000);
        assert!(bytes.len() > 44);
    }

    #[test]
    fn empty_input_still_produces_a_valid_header() {
        let bytes = encode_wav(&[], 16_000);
        assert_eq!(&bytes[0..4], b"RIFF");
    }
}
