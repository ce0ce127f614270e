//! Offline transcription backend built on whisper-rs.
//!
//! Loads a GGML model once at startup and runs inference on a blocking
//! worker thread per request.  `WhisperContext` is immutable after load and
//! shared via `Arc`; each call creates its own `WhisperState`, so concurrent
//! calls never contend on model weights.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::{downmix_to_mono, read_wav, resample_to_16k, VadDetector};
use crate::config::{AppPaths, LocalModelConfig};
use crate::transcribe::backend::{TranscriptionError, Transcriber};
use crate::transcribe::result::{TranscriptSegment, TranscriptionResult};

/// Sample rate whisper models are trained on.
const WHISPER_SAMPLE_RATE: u32 = 16_000;

// ---------------------------------------------------------------------------
// Model path resolution
// ---------------------------------------------------------------------------

/// Resolve the GGML model file for the configured size and precision.
///
/// Prefers the precision-specific variant (e.g. `ggml-small-q8_0.bin`) and
/// falls back to the plain `ggml-<size>.bin` when the variant is absent.
pub(crate) fn resolve_model_path(config: &LocalModelConfig) -> Result<PathBuf, TranscriptionError> {
    let model_dir = config
        .model_dir
        .clone()
        .unwrap_or_else(|| AppPaths::new().models_dir);

    let variant = model_dir.join(format!(
        "ggml-{}{}.bin",
        config.model_size,
        config.precision.file_suffix()
    ));
    if variant.exists() {
        return Ok(variant);
    }

    let plain = model_dir.join(format!("ggml-{}.bin", config.model_size));
    if plain.exists() {
        if variant != plain {
            log::warn!(
                "model variant {} not found, falling back to {}",
                variant.display(),
                plain.display()
            );
        }
        return Ok(plain);
    }

    Err(TranscriptionError::ModelNotFound(format!(
        "no model file for size '{}' in {} (looked for {} and {})",
        config.model_size,
        model_dir.display(),
        variant
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        plain
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    )))
}

// ---------------------------------------------------------------------------
// LocalWhisperTranscriber
// ---------------------------------------------------------------------------

/// Transcriber backed by a locally loaded whisper GGML model.
pub struct LocalWhisperTranscriber {
    ctx: Arc<WhisperContext>,
    config: LocalModelConfig,
    backend_id: String,
}

impl LocalWhisperTranscriber {
    /// Load the model named by `config` into memory.
    ///
    /// # Errors
    ///
    /// Returns [`TranscriptionError::ModelNotFound`] when no model file
    /// exists for the configured size, or [`TranscriptionError::ModelInit`]
    /// when whisper-rs rejects the file.
    pub fn load(config: LocalModelConfig) -> Result<Self, TranscriptionError> {
        let model_path = resolve_model_path(&config)?;
        log::info!("loading whisper model from {}", model_path.display());

        let mut ctx_params = WhisperContextParameters::default();
        ctx_params.use_gpu(config.device != "cpu");

        let ctx = WhisperContext::new_with_params(
            model_path
                .to_str()
                .ok_or_else(|| TranscriptionError::ModelInit("non-UTF-8 model path".into()))?,
            ctx_params,
        )
        .map_err(|e| TranscriptionError::ModelInit(e.to_string()))?;

        let backend_id = format!("whisper-local/{}", config.model_size);
        Ok(Self {
            ctx: Arc::new(ctx),
            config,
            backend_id,
        })
    }

    /// Read a waveform file and normalise it to 16 kHz mono f32.
    fn load_audio(&self, audio_path: &Path) -> Result<Vec<f32>, TranscriptionError> {
        let wav = read_wav(audio_path).map_err(|e| TranscriptionError::AudioRead {
            path: audio_path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mono = downmix_to_mono(&wav.samples, wav.channels);
        if wav.sample_rate == WHISPER_SAMPLE_RATE {
            Ok(mono)
        } else {
            Ok(resample_to_16k(&mono, wav.sample_rate))
        }
    }
}

#[async_trait]
impl Transcriber for LocalWhisperTranscriber {
    async fn transcribe(
        &self,
        audio_path: &Path,
        language: Option<&str>,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        let samples = self.load_audio(audio_path)?;

        // Trim surrounding silence; the leading offset keeps segment
        // timestamps aligned with the original recording.
        let (samples, offset_secs) = if self.config.vad_filter {
            let vad = VadDetector::new(self.config.vad_threshold);
            let (trimmed, leading) = vad.trim_silence(&samples);
            (trimmed.to_vec(), leading as f64 / WHISPER_SAMPLE_RATE as f64)
        } else {
            (samples, 0.0)
        };

        if samples.is_empty() {
            log::debug!("audio is entirely silence after trimming");
            return Ok(TranscriptionResult {
                text: String::new(),
                segments: Vec::new(),
                detected_language: language.map(str::to_string),
                backend: self.backend_id.clone(),
            });
        }

        let ctx = Arc::clone(&self.ctx);
        let requested = language.map(str::to_string);
        let backend = self.backend_id.clone();

        // whisper inference is CPU-bound and can take seconds; keep it off
        // the async runtime's worker threads.
        tokio::task::spawn_blocking(move || {
            run_inference(&ctx, &samples, requested, offset_secs, backend)
        })
        .await
        .map_err(|e| TranscriptionError::Inference(format!("inference task panicked: {e}")))?
    }

    fn backend_id(&self) -> &str {
        &self.backend_id
    }
}

// ---------------------------------------------------------------------------
// Inference
// ---------------------------------------------------------------------------

fn run_inference(
    ctx: &WhisperContext,
    samples: &[f32],
    requested_language: Option<String>,
    offset_secs: f64,
    backend: String,
) -> Result<TranscriptionResult, TranscriptionError> {
    let mut state = ctx
        .create_state()
        .map_err(|e| TranscriptionError::ModelInit(e.to_string()))?;

    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
    params.set_language(requested_language.as_deref());
    params.set_print_special(false);
    params.set_print_progress(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);

    let n_threads = std::thread::available_parallelism()
        .map(|n| n.get() as i32)
        .unwrap_or(4)
        .min(8);
    params.set_n_threads(n_threads);

    state
        .full(params, samples)
        .map_err(|e| TranscriptionError::Inference(e.to_string()))?;

    let n_segments = state
        .full_n_segments()
        .map_err(|e| TranscriptionError::Inference(e.to_string()))?;

    let mut segments = Vec::with_capacity(n_segments as usize);
    for i in 0..n_segments {
        let text = state
            .full_get_segment_text(i)
            .map_err(|e| TranscriptionError::Inference(e.to_string()))?;
        // Segment bounds arrive in centiseconds.
        let t0 = state
            .full_get_segment_t0(i)
            .map_err(|e| TranscriptionError::Inference(e.to_string()))?;
        let t1 = state
            .full_get_segment_t1(i)
            .map_err(|e| TranscriptionError::Inference(e.to_string()))?;

        segments.push(TranscriptSegment {
            start: t0 as f64 * 0.01 + offset_secs,
            end: t1 as f64 * 0.01 + offset_secs,
            text: text.trim().to_string(),
            language: None,
        });
    }

    // Prefer the caller's forced language; otherwise report what the model
    // auto-detected for the run.
    let detected_language = requested_language.or_else(|| {
        state
            .full_lang_id_from_state()
            .ok()
            .and_then(whisper_rs::get_lang_str)
            .map(str::to_string)
    });

    let text = TranscriptionResult::join_segment_texts(&segments);

    Ok(TranscriptionResult {
        text,
        segments,
        detected_language,
        backend,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ComputePrecision;
    use tempfile::tempdir;

    fn config_in(dir: &Path) -> LocalModelConfig {
        LocalModelConfig {
            model_dir: Some(dir.to_path_buf()),
            ..LocalModelConfig::default()
        }
    }

    #[test]
    fn resolve_prefers_precision_variant() {
        let dir = tempdir().expect("temp dir");
        std::fs::write(dir.path().join("ggml-small-q8_0.bin"), b"x").unwrap();
        std::fs::write(dir.path().join("ggml-small.bin"), b"x").unwrap();

        let path = resolve_model_path(&config_in(dir.path())).expect("resolve");
        assert!(path.ends_with("ggml-small-q8_0.bin"));
    }

    #[test]
    fn resolve_falls_back_to_plain_file() {
        let dir = tempdir().expect("temp dir");
        std::fs::write(dir.path().join("ggml-small.bin"), b"x").unwrap();

        // int8 variant missing, plain present
        let path = resolve_model_path(&config_in(dir.path())).expect("resolve");
        assert!(path.ends_with("ggml-small.bin"));
    }

    #[test]
    fn resolve_reports_missing_model() {
        let dir = tempdir().expect("temp dir");
        let err = resolve_model_path(&config_in(dir.path())).unwrap_err();
        match err {
            TranscriptionError::ModelNotFound(msg) => {
                assert!(msg.contains("small"), "message should name the size: {msg}");
            }
            other => panic!("expected ModelNotFound, got {other:?}"),
        }
    }

    #[test]
    fn float16_variant_is_the_plain_file() {
        let dir = tempdir().expect("temp dir");
        std::fs::write(dir.path().join("ggml-small.bin"), b"x").unwrap();

        let mut cfg = config_in(dir.path());
        cfg.precision = ComputePrecision::Float16;

        let path = resolve_model_path(&cfg).expect("resolve");
        assert!(path.ends_with("ggml-small.bin"));
    }
}
