//! Transcription backends behind one trait.
//!
//! The application picks a backend at startup and holds it as an
//! `Arc<dyn Transcriber>`; everything downstream of the recorder only ever
//! sees [`TranscriptionResult`].
//!
//! * [`LocalWhisperTranscriber`] — offline inference with whisper-rs.
//! * [`OpenAiTranscriber`] — OpenAI's hosted audio API.

pub mod backend;
pub mod local;
pub mod openai;
pub mod result;

use std::sync::Arc;

pub use backend::{Transcriber, TranscriptionError};
pub use local::LocalWhisperTranscriber;
pub use openai::OpenAiTranscriber;
pub use result::{TranscriptSegment, TranscriptionResult};

use crate::config::{AppConfig, BackendKind};

/// Construct the backend selected in `config`.
///
/// # Errors
///
/// Propagates backend construction failures: a missing local model file or
/// an unconfigured OpenAI credential.
pub fn build_transcriber(config: &AppConfig) -> Result<Arc<dyn Transcriber>, TranscriptionError> {
    match config.backend {
        BackendKind::Local => Ok(Arc::new(LocalWhisperTranscriber::load(
            config.local.clone(),
        )?)),
        BackendKind::OpenAi => Ok(Arc::new(OpenAiTranscriber::from_config(&config.openai)?)),
    }
}
