//! PCM conversion for captured audio.
//!
//! Every capture path ends in the same shape: mono, signed 16-bit samples
//! at the configured recogniser rate, wrapped in a WAV container by `hound`.
//! The on-device recogniser reads those clips back at 16 kHz.

use std::io::Cursor;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use super::capture::AudioError;

/// Default recogniser rate, and the rate Whisper expects.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

// ---------------------------------------------------------------------------
// downmix
// ---------------------------------------------------------------------------

/// Average interleaved frames down to a single channel.
///
/// `channels == 0` yields an empty buffer; trailing partial frames are
/// dropped.
pub fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => interleaved.to_vec(),
        n => {
            let width = n as usize;
            interleaved
                .chunks_exact(width)
                .map(|frame| frame.iter().sum::<f32>() / width as f32)
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// resample
// ---------------------------------------------------------------------------

/// Linear-interpolation resampler from `from_rate` to `to_rate`.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 || to_rate == 0 {
        return samples.to_vec();
    }

    let step = from_rate as f64 / to_rate as f64;
    let out_len = (samples.len() as f64 / step).ceil() as usize;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = pos as usize;
            let frac = (pos - idx as f64) as f32;
            match (samples.get(idx), samples.get(idx + 1)) {
                (Some(a), Some(b)) => a + (b - a) * frac,
                (Some(a), None) => *a,
                _ => 0.0,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// LINEAR16 / WAV
// ---------------------------------------------------------------------------

/// Clamp to `[-1.0, 1.0]` and scale to signed 16-bit.
pub fn to_linear16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16)
        .collect()
}

/// Wrap mono 16-bit samples in an in-memory WAV file.
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, AudioError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut buffer = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    let mut writer = WavWriter::new(&mut buffer, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(buffer.into_inner())
}

/// Decode any PCM WAV into mono `f32` samples at `to_rate`.
///
/// Integer samples are scaled by their bit depth; multi-channel files are
/// downmixed before resampling.
pub fn decode_wav(bytes: &[u8], to_rate: u32) -> Result<Vec<f32>, AudioError> {
    let mut reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let mono = downmix(&interleaved, spec.channels);
    Ok(resample(&mono, spec.sample_rate, to_rate))
}

/// Full conversion from a raw device buffer to mono WAV bytes at `to_rate`.
pub fn device_buffer_to_wav(
    interleaved: &[f32],
    channels: u16,
    from_rate: u32,
    to_rate: u32,
) -> Result<Vec<u8>, AudioError> {
    let mono = downmix(interleaved, channels);
    let resampled = resample(&mono, from_rate, to_rate);
    encode_wav(&to_linear16(&resampled), to_rate)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
