//! Core [`Transcriber`] trait and the backend error taxonomy.
//!
//! The trait is the narrow contract both backends implement: hand it a path
//! to a waveform file and an optional forced language, get back one
//! [`TranscriptionResult`] or a [`TranscriptionError`].  It is object-safe
//! and `Send + Sync` so the application can hold an `Arc<dyn Transcriber>`
//! chosen at startup.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::transcribe::result::TranscriptionResult;

// ---------------------------------------------------------------------------
// TranscriptionError
// ---------------------------------------------------------------------------

/// Backend-phase failures.  Disjoint from [`RecordingError`] — a transcriber
/// is only ever invoked with a successfully assembled waveform.
///
/// [`RecordingError`]: crate::recorder::RecordingError
#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// No GGML model file at the resolved path.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// whisper-rs failed to initialise a context or per-call state.
    #[error("failed to initialise local model: {0}")]
    ModelInit(String),

    /// The local inference pass failed.
    #[error("local inference failed: {0}")]
    Inference(String),

    /// The audio file could not be read or decoded.
    #[error("failed to read audio file {path}: {reason}")]
    AudioRead { path: String, reason: String },

    /// The OpenAI backend was selected without a credential.  Checked at
    /// construction time, never lazily.
    #[error("OpenAI API key not configured; set OPENAI_API_KEY or pass --openai-api-key")]
    MissingApiKey,

    /// HTTP transport or connection error.
    #[error("transcription request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("transcription request timed out")]
    Timeout,

    /// The API answered with a non-success status.
    #[error("transcription API returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("failed to parse transcription response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for TranscriptionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TranscriptionError::Timeout
        } else {
            TranscriptionError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Transcriber trait
// ---------------------------------------------------------------------------

/// Uniform interface over heterogeneous transcription backends.
///
/// # Contract
///
/// * `audio_path` points at a readable waveform file.
/// * `language` forces a language code (e.g. `"de"`); `None` means automatic
///   detection.
/// * The returned result's `segments` keep the backend's source order and its
///   `text` is never absent (empty string at minimum).
/// * Implementations never retry; retry policy belongs to the caller.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio file at `audio_path`.
    async fn transcribe(
        &self,
        audio_path: &Path,
        language: Option<&str>,
    ) -> Result<TranscriptionResult, TranscriptionError>;

    /// Stable identifier naming this backend and its configured model.
    fn backend_id(&self) -> &str;
}

// Compile-time assertion: Box<dyn Transcriber> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Transcriber>) {}
};

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_message_names_the_env_var() {
        let e = TranscriptionError::MissingApiKey;
        assert!(e.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn api_error_display_includes_status() {
        let e = TranscriptionError::Api {
            status: 429,
            message: "rate limited".into(),
        };
        let text = e.to_string();
        assert!(text.contains("429"));
        assert!(text.contains("rate limited"));
    }

    #[test]
    fn audio_read_display_includes_path() {
        let e = TranscriptionError::AudioRead {
            path: "/tmp/x.wav".into(),
            reason: "truncated header".into(),
        };
        assert!(e.to_string().contains("/tmp/x.wav"));
    }
}
