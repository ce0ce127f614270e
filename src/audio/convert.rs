//! Channel downmix and sample-rate conversion for backend input.
//!
//! The local Whisper backend requires **16 kHz mono `f32`** audio.  Recorded
//! sessions already use that format by default, but `--input-file` can point
//! at an arbitrary WAV, so the backend normalises with these two steps:
//!
//! 1. [`downmix_to_mono`] — average interleaved channels down to one.
//! 2. [`resample_to_16k`] — linear-interpolation resample to 16 000 Hz.

// ---------------------------------------------------------------------------
// downmix_to_mono
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel audio down to mono by averaging all channels.
///
/// The output length is `samples.len() / channels`.
///
/// * If `channels == 1` the input slice is returned as an owned `Vec` with no
///   averaging.
/// * If `channels == 0` an empty vector is returned.
///
/// # Example
///
/// ```rust
/// use voice_notes::audio::downmix_to_mono;
///
/// let stereo = vec![0.5_f32, -0.5, 0.2, -0.2]; // L R L R
/// let mono = downmix_to_mono(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[0] - 0.0).abs() < 1e-6);
/// assert!((mono[1] - 0.0).abs() < 1e-6);
/// ```
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// resample_to_16k
// ---------------------------------------------------------------------------

/// Resample mono audio from `source_rate` Hz to the 16 000 Hz whisper input
/// rate, interpolating linearly between neighbouring source samples.
///
/// Linear interpolation is plenty for speech headed into an STT model; the
/// aliasing it admits sits above the frequencies whisper cares about.
///
/// * `source_rate == 16_000` returns a plain copy.
/// * Empty input yields empty output.
///
/// Output length is `ceil(samples.len() * 16_000 / source_rate)`.
pub fn resample_to_16k(samples: &[f32], source_rate: u32) -> Vec<f32> {
    const TARGET_RATE: u32 = 16_000;

    if source_rate == TARGET_RATE {
        return samples.to_vec();
    }
    if samples.is_empty() {
        return Vec::new();
    }

    // Source position advances by this much per output sample.
    let step = source_rate as f64 / TARGET_RATE as f64;
    let output_len =
        (samples.len() as f64 * TARGET_RATE as f64 / source_rate as f64).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let pos = i as f64 * step;
            let left = pos as usize;
            let t = (pos - left as f64) as f32;

            match (samples.get(left), samples.get(left + 1)) {
                (Some(&a), Some(&b)) => a + (b - a) * t,
                // Past the last sample pair: hold the final value.
                (Some(&a), None) => a,
                _ => 0.0,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- downmix_to_mono ---------------------------------------------------

    #[test]
    fn downmix_already_mono() {
        let input = vec![0.1_f32, 0.2, 0.3];
        let out = downmix_to_mono(&input, 1);
        assert_eq!(out, input);
    }

    #[test]
    fn downmix_two_channel() {
        let input = vec![1.0_f32, -1.0, 0.5, 0.5];
        let out = downmix_to_mono(&input, 2);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 0.0).abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn downmix_zero_channels() {
        let out = downmix_to_mono(&[1.0_f32, 2.0], 0);
        assert!(out.is_empty());
    }

    // ---- resample_to_16k ---------------------------------------------------

    #[test]
    fn resample_already_16k_is_noop() {
        let input: Vec<f32> = (0..160).map(|i| i as f32 / 160.0).collect();
        let out = resample_to_16k(&input, 16_000);
        assert_eq!(out, input);
    }

    #[test]
    fn resample_empty_input() {
        let out = resample_to_16k(&[], 48_000);
        assert!(out.is_empty());
    }

    #[test]
    fn resample_48k_to_16k_output_length() {
        // 480 samples @ 48 kHz = 10 ms → 160 samples @ 16 kHz
        let input = vec![0.5_f32; 480];
        let out = resample_to_16k(&input, 48_000);
        assert_eq!(out.len(), 160);
    }

    #[test]
    fn resample_constant_signal_preserves_amplitude() {
        let input = vec![0.5_f32; 480];
        let out = resample_to_16k(&input, 48_000);
        for &s in &out {
            assert!((s - 0.5).abs() < 1e-5, "amplitude drift: {s}");
        }
    }

    #[test]
    fn resample_upsample_from_8k() {
        let input = vec![0.0_f32; 80]; // 10 ms @ 8 kHz
        let out = resample_to_16k(&input, 8_000);
        assert_eq!(out.len(), 160);
    }
}
