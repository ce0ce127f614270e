//! Audio I/O — microphone capture, WAV container I/O, backend input prep.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → AudioChunk (mpsc) → Recorder → WAV (hound)
//!                                                               │
//!                          local backend: read_wav → downmix_to_mono
//!                                       → resample_to_16k → VadDetector
//! ```

pub mod capture;
pub mod convert;
pub mod vad;
pub mod wav;

pub use capture::{AudioCapture, AudioChunk, CaptureError, StreamHandle};
pub use convert::{downmix_to_mono, resample_to_16k};
pub use vad::VadDetector;
pub use wav::{read_wav, write_wav, WavAudio, WavError};
