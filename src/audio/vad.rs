//! Energy-based voice-activity trimming for the local backend.
//!
//! [`VadDetector`] removes leading and trailing silence from a 16 kHz mono
//! clip before Whisper inference.  Trimming shortens the inference pass and
//! keeps Whisper from hallucinating text over quiet stretches.  It is a
//! configurable option on the local backend (`vad_filter` in the settings),
//! not a hard-coded step.
//!
//! Audio is split into 30 ms frames (480 samples @ 16 kHz); a frame counts as
//! voice when its RMS amplitude exceeds the threshold.  The trim result also
//! reports how many leading samples were removed so segment timestamps can be
//! shifted back to the original audio's timeline.

// ---------------------------------------------------------------------------
// VadDetector
// ---------------------------------------------------------------------------

/// Energy-based silence trimmer.
///
/// # Example
///
/// ```rust
/// use voice_notes::audio::VadDetector;
///
/// let vad = VadDetector::new(0.01);
///
/// // 480 silent samples, 480 loud samples, 480 silent samples
/// let mut audio = vec![0.0_f32; 480];
/// audio.extend(vec![0.5_f32; 480]);
/// audio.extend(vec![0.0_f32; 480]);
///
/// let (trimmed, offset) = vad.trim_silence(&audio);
/// assert_eq!(trimmed.len(), 480);
/// assert_eq!(offset, 480); // one leading frame was dropped
/// ```
pub struct VadDetector {
    /// RMS amplitude threshold; frames below this are considered silence.
    rms_threshold: f32,
    /// Frame size in samples (480 = 30 ms at 16 kHz).
    frame_size: usize,
}

impl VadDetector {
    /// Create a [`VadDetector`] with the given RMS threshold.
    ///
    /// `rms_threshold` should be in `[0.0, 1.0]`.  `0.01` suits a quiet room;
    /// use `0.02`–`0.05` in noisy environments.
    pub fn new(rms_threshold: f32) -> Self {
        Self {
            rms_threshold,
            frame_size: 480, // 30 ms at 16 kHz
        }
    }

    /// RMS threshold currently in use.
    pub fn threshold(&self) -> f32 {
        self.rms_threshold
    }

    fn is_voice_frame(&self, chunk: &[f32]) -> bool {
        if chunk.is_empty() {
            return false;
        }
        let mean_sq: f32 = chunk.iter().map(|s| s * s).sum::<f32>() / chunk.len() as f32;
        mean_sq.sqrt() > self.rms_threshold
    }

    /// Trim leading and trailing silence from `audio`.
    ///
    /// Returns the trimmed sub-slice (no allocation) and the number of
    /// leading samples removed.  Callers add `offset / 16_000.0` seconds to
    /// segment timestamps so they stay relative to the untrimmed audio.
    /// If the entire signal is silent, `(&[], 0)` is returned.
    pub fn trim_silence<'a>(&self, audio: &'a [f32]) -> (&'a [f32], usize) {
        if audio.is_empty() {
            return (audio, 0);
        }

        let frame_size = self.frame_size;
        let total_frames = audio.len().div_ceil(frame_size);

        let frame_bounds = |i: usize| {
            let s = i * frame_size;
            let e = ((i + 1) * frame_size).min(audio.len());
            (s, e)
        };

        let start_frame = match (0..total_frames).find(|&i| {
            let (s, e) = frame_bounds(i);
            self.is_voice_frame(&audio[s..e])
        }) {
            Some(f) => f,
            None => return (&audio[0..0], 0), // entire signal is silence
        };

        let end_frame = (0..total_frames)
            .rfind(|&i| {
                let (s, e) = frame_bounds(i);
                self.is_voice_frame(&audio[s..e])
            })
            .unwrap_or(start_frame);

        let start = start_frame * frame_size;
        let end = ((end_frame + 1) * frame_size).min(audio.len());

        (&audio[start..end], start)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_signal(silent_pre: usize, voice: usize, silent_post: usize) -> Vec<f32> {
        let mut v = vec![0.0_f32; silent_pre];
        v.extend(vec![0.5_f32; voice]);
        v.extend(vec![0.0_f32; silent_post]);
        v
    }

    #[test]
    fn trims_leading_and_trailing_silence() {
        let audio = make_signal(480, 480, 480);
        let vad = VadDetector::new(0.01);
        let (trimmed, offset) = vad.trim_silence(&audio);
        assert_eq!(trimmed.len(), 480);
        assert_eq!(offset, 480);
    }

    #[test]
    fn all_silence_returns_empty() {
        let audio = vec![0.0_f32; 1_440];
        let vad = VadDetector::new(0.01);
        let (trimmed, offset) = vad.trim_silence(&audio);
        assert!(trimmed.is_empty());
        assert_eq!(offset, 0);
    }

    #[test]
    fn no_silence_returns_full_signal() {
        let audio = vec![0.5_f32; 960];
        let vad = VadDetector::new(0.01);
        let (trimmed, offset) = vad.trim_silence(&audio);
        assert_eq!(trimmed.len(), audio.len());
        assert_eq!(offset, 0);
    }

    #[test]
    fn empty_input_returns_empty() {
        let vad = VadDetector::new(0.01);
        let (trimmed, offset) = vad.trim_silence(&[]);
        assert!(trimmed.is_empty());
        assert_eq!(offset, 0);
    }

    #[test]
    fn offset_spans_multiple_silent_frames() {
        let audio = make_signal(1_440, 480, 0); // three silent frames first
        let vad = VadDetector::new(0.01);
        let (trimmed, offset) = vad.trim_silence(&audio);
        assert_eq!(trimmed.len(), 480);
        assert_eq!(offset, 1_440);
    }

    #[test]
    fn threshold_getter() {
        let vad = VadDetector::new(0.05);
        assert!((vad.threshold() - 0.05).abs() < 1e-7);
    }
}
