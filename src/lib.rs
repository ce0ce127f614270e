//! voice-notes — push-to-talk voice notes with markdown transcripts.
//!
//! # Architecture
//!
//! ```text
//! Microphone → cpal callback → AudioChunk (mpsc) ─┐
//!                                                 ├─▶ Recorder ─▶ RecordedAudio
//! Hotkeys → SignalSource → stop / cancel flags ───┘        │
//!                                                          ▼
//!                                               WAV file (hound, f32 PCM)
//!                                                          │
//!                                                          ▼
//!                              Transcriber (local whisper-rs | OpenAI API)
//!                                                          │
//!                                                          ▼
//!                              TranscriptionResult ─▶ markdown transcript
//! ```
//!
//! The [`recorder`] module owns the concurrent capture session: a cpal
//! callback produces [`audio::AudioChunk`]s into an unbounded channel while a
//! listener thread waits for the stop or cancel hotkey; the session controller
//! polls the channel, performs a final drain after the stop flag is observed,
//! and assembles the waveform.
//!
//! The [`transcribe`] module normalizes two heterogeneous backends — offline
//! whisper-rs inference and the OpenAI audio API — into one
//! [`transcribe::TranscriptionResult`] shape with per-segment timing.

pub mod audio;
pub mod config;
pub mod output;
pub mod recorder;
pub mod transcribe;
