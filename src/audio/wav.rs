//! WAV container I/O via `hound`.
//!
//! The recorder writes one 32-bit float PCM WAV per session so the captured
//! samples round-trip losslessly.  Reading supports the float format we write
//! plus the common integer widths, so `--input-file` works with WAVs produced
//! by other tools.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use thiserror::Error;

/// Errors from reading or writing a WAV file.
#[derive(Debug, Error)]
pub enum WavError {
    #[error("wav i/o failed: {0}")]
    Hound(#[from] hound::Error),

    #[error("unsupported wav format: {bits}-bit {format:?}")]
    UnsupportedFormat {
        bits: u16,
        format: SampleFormat,
    },
}

/// Decoded WAV contents: interleaved f32 samples plus the source format.
#[derive(Debug, Clone)]
pub struct WavAudio {
    /// Interleaved samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
}

/// Write interleaved f32 `samples` to `path` as 32-bit float PCM.
///
/// The float encoding preserves the captured samples bit-for-bit, so a
/// [`read_wav`] of the written file yields the exact same data.
pub fn write_wav(
    path: &Path,
    samples: &[f32],
    sample_rate: u32,
    channels: u16,
) -> Result<(), WavError> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Read a WAV file into interleaved f32 samples.
///
/// Accepts 32-bit float (our own session files) as well as 16-, 24- and
/// 32-bit integer PCM, normalised into `[-1.0, 1.0]`.
///
/// # Errors
///
/// [`WavError::UnsupportedFormat`] for sample formats outside that set;
/// [`WavError::Hound`] for container or I/O failures.
pub fn read_wav(path: &Path) -> Result<WavAudio, WavError> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()?,
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32_768.0))
            .collect::<Result<Vec<_>, _>>()?,
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8_388_608.0))
            .collect::<Result<Vec<_>, _>>()?,
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2_147_483_648.0))
            .collect::<Result<Vec<_>, _>>()?,
        (format, bits) => {
            return Err(WavError::UnsupportedFormat { bits, format });
        }
    };

    Ok(WavAudio {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
