//! The normalized transcription result shared by all backends.
//!
//! Both backends — local Whisper inference and the OpenAI audio API — reduce
//! their responses to [`TranscriptionResult`].  The result is plain data:
//! constructing it twice from the same backend response yields field-for-field
//! identical values, and nothing downstream can mutate it back into the
//! backends.

// ---------------------------------------------------------------------------
// TranscriptSegment
// ---------------------------------------------------------------------------

/// A time-bounded slice of the transcript.
///
/// `start`/`end` are seconds from the beginning of the source audio, with
/// `0.0 <= start <= end`.  `language` is the per-segment tag if the backend
/// provides one; it is independent of the result-level detected language.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    /// Segment start in seconds (>= 0).
    pub start: f64,
    /// Segment end in seconds (>= start).
    pub end: f64,
    /// Segment text.
    pub text: String,
    /// Optional per-segment language code.
    pub language: Option<String>,
}

impl TranscriptSegment {
    /// Segment length in seconds; never negative.
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

// ---------------------------------------------------------------------------
// TranscriptionResult
// ---------------------------------------------------------------------------

/// The uniform output of a transcription call.
///
/// * `segments` keeps the backend's own chronological order — no re-sorting.
/// * `text` is always present; the empty string is the floor for a response
///   with no speech.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionResult {
    /// Full transcript text, trimmed.
    pub text: String,
    /// Time-aligned segments in source order (may be empty).
    pub segments: Vec<TranscriptSegment>,
    /// Language the backend detected for the whole result, if any.
    pub detected_language: Option<String>,
    /// Identifies which backend produced this result, e.g.
    /// `whisper-local/small` or `openai/gpt-4o-mini-transcribe`.
    pub backend: String,
}

impl TranscriptionResult {
    /// Space-join the trimmed segment texts, in order.
    ///
    /// This is the text rule for backends that deliver only segments (the
    /// local variant); an empty segment list yields the empty string.
    pub fn join_segment_texts(segments: &[TranscriptSegment]) -> String {
        segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
