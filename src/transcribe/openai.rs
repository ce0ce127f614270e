//! Hosted transcription backend using OpenAI's audio API.
//!
//! Uploads the waveform as multipart form data to
//! `/v1/audio/transcriptions` with `response_format=verbose_json` so the
//! response carries per-segment timestamps.  The credential is resolved at
//! construction time — config value first, then the `OPENAI_API_KEY`
//! environment variable — so a missing key fails before any audio is
//! recorded.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;

use crate::config::OpenAiConfig;
use crate::transcribe::backend::{TranscriptionError, Transcriber};
use crate::transcribe::result::{TranscriptSegment, TranscriptionResult};

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// The `verbose_json` response body.  Every field is optional: the API is
/// free to omit `segments` entirely and individual segments may lack
/// timestamps, so defaults are applied during conversion rather than
/// trusting the payload shape.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiTranscription {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    segments: Option<Vec<ApiSegment>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiSegment {
    #[serde(default)]
    start: Option<f64>,
    #[serde(default)]
    end: Option<f64>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

/// Normalise a decoded API response into the backend-neutral result.
///
/// Missing numeric fields become `0.0`, missing text the empty string, and
/// an absent segment list an empty vec.  Segment order is preserved as sent.
/// Per-segment language is whatever the segment itself carried — the
/// response-level language is never copied down.
pub(crate) fn convert_response(
    response: ApiTranscription,
    backend: &str,
) -> TranscriptionResult {
    let detected_language = response.language;
    let segments = response
        .segments
        .unwrap_or_default()
        .into_iter()
        .map(|s| TranscriptSegment {
            start: s.start.unwrap_or(0.0),
            end: s.end.unwrap_or(0.0),
            text: s.text.unwrap_or_default().trim().to_string(),
            language: s.language,
        })
        .collect();

    TranscriptionResult {
        text: response.text.unwrap_or_default().trim().to_string(),
        segments,
        detected_language,
        backend: backend.to_string(),
    }
}

// ---------------------------------------------------------------------------
// OpenAiTranscriber
// ---------------------------------------------------------------------------

/// Transcriber that delegates to OpenAI's hosted audio API.
#[derive(Debug)]
pub struct OpenAiTranscriber {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    backend_id: String,
}

impl OpenAiTranscriber {
    /// Build a transcriber from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TranscriptionError::MissingApiKey`] when neither the config
    /// nor the `OPENAI_API_KEY` environment variable provides a non-empty
    /// key, and [`TranscriptionError::Request`] when the HTTP client cannot
    /// be constructed with the configured timeout.
    pub fn from_config(config: &OpenAiConfig) -> Result<Self, TranscriptionError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or(TranscriptionError::MissingApiKey)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TranscriptionError::Request(e.to_string()))?;

        let endpoint = format!(
            "{}/v1/audio/transcriptions",
            config.base_url.trim_end_matches('/')
        );
        let backend_id = format!("openai/{}", config.model);

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            endpoint,
            backend_id,
        })
    }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    async fn transcribe(
        &self,
        audio_path: &Path,
        language: Option<&str>,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        let bytes =
            tokio::fs::read(audio_path)
                .await
                .map_err(|e| TranscriptionError::AudioRead {
                    path: audio_path.display().to_string(),
                    reason: e.to_string(),
                })?;

        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.wav".to_string());

        let file_part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/wav")
            .map_err(|e| TranscriptionError::Request(e.to_string()))?;

        let mut form = multipart::Form::new()
            .text("model", self.model.clone())
            .text("temperature", "0")
            .text("response_format", "verbose_json")
            .part("file", file_part);
        if let Some(lang) = language {
            form = form.text("language", lang.to_string());
        }

        log::debug!("uploading audio to {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TranscriptionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ApiTranscription = response
            .json()
            .await
            .map_err(|e| TranscriptionError::Parse(e.to_string()))?;

        Ok(convert_response(body, &self.backend_id))
    }

    fn backend_id(&self) -> &str {
        &self.backend_id
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_verbose_json_response() {
        let json = r#"{
            "text": " Hallo Welt ",
            "language": "german",
            "segments": [
                {"start": 0.0, "end": 1.4, "text": " Hallo"},
                {"start": 1.4, "end": 2.6, "text": " Welt"}
            ]
        }"#;
        let api: ApiTranscription = serde_json::from_str(json).expect("decode");
        let result = convert_response(api, "openai/gpt-4o-mini-transcribe");

        assert_eq!(result.text, "Hallo Welt");
        assert_eq!(result.segments.len(), 2);
        assert_eq!(result.segments[0].text, "Hallo");
        assert_eq!(result.segments[1].start, 1.4);
        // verbose_json segments carry no language of their own; the
        // response-level code must not be copied onto them.
        assert!(result.segments[0].language.is_none());
        assert!(result.segments[1].language.is_none());
        assert_eq!(result.detected_language.as_deref(), Some("german"));
        assert_eq!(result.backend, "openai/gpt-4o-mini-transcribe");
    }

    #[test]
    fn segment_language_is_passed_through_when_present() {
        let json = r#"{
            "text": "hi there",
            "language": "english",
            "segments": [
                {"start": 0.0, "end": 0.8, "text": "hi", "language": "en"},
                {"start": 0.8, "end": 1.6, "text": "there"}
            ]
        }"#;
        let api: ApiTranscription = serde_json::from_str(json).expect("decode");
        let result = convert_response(api, "openai/test");

        assert_eq!(result.segments[0].language.as_deref(), Some("en"));
        assert!(result.segments[1].language.is_none());
        assert_eq!(result.detected_language.as_deref(), Some("english"));
    }

    #[test]
    fn missing_segment_fields_default_to_zero() {
        let json = r#"{"text": "hi", "segments": [{"text": "hi"}]}"#;
        let api: ApiTranscription = serde_json::from_str(json).expect("decode");
        let result = convert_response(api, "openai/test");

        assert_eq!(result.segments[0].start, 0.0);
        assert_eq!(result.segments[0].end, 0.0);
        assert_eq!(result.segments[0].text, "hi");
        assert!(result.detected_language.is_none());
    }

    #[test]
    fn missing_text_and_segments_yield_empty_result() {
        let json = r#"{}"#;
        let api: ApiTranscription = serde_json::from_str(json).expect("decode");
        let result = convert_response(api, "openai/test");

        assert_eq!(result.text, "");
        assert!(result.segments.is_empty());
        assert!(result.detected_language.is_none());
    }

    #[test]
    fn config_key_takes_priority_and_empty_key_is_rejected() {
        let mut config = OpenAiConfig {
            api_key: Some("sk-config".into()),
            ..OpenAiConfig::default()
        };
        let t = OpenAiTranscriber::from_config(&config).expect("key from config");
        assert_eq!(t.api_key, "sk-config");
        assert_eq!(t.backend_id(), "openai/gpt-4o-mini-transcribe");

        // Whitespace-only keys are treated as absent.  (The env fallback is
        // not exercised here to keep the test hermetic.)
        config.api_key = Some("   ".into());
        if std::env::var("OPENAI_API_KEY").is_err() {
            let err = OpenAiTranscriber::from_config(&config).unwrap_err();
            assert!(matches!(err, TranscriptionError::MissingApiKey));
        }
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let config = OpenAiConfig {
            api_key: Some("sk-test".into()),
            base_url: "https://api.openai.com/".into(),
            ..OpenAiConfig::default()
        };
        let t = OpenAiTranscriber::from_config(&config).expect("build");
        assert_eq!(t.endpoint, "https://api.openai.com/v1/audio/transcriptions");
    }
}
