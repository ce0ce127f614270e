//! Recording sessions — signal sources, the capture state machine, and the
//! assembled waveform.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use voice_notes::recorder::{HotkeySignalHub, Recorder, RecordingOutcome};
//!
//! let hub = HotkeySignalHub::start(rdev::Key::Space, rdev::Key::Escape);
//! let recorder = Recorder::new(16_000, 1);
//!
//! loop {
//!     match recorder.record(hub.session_source()) {
//!         Ok(RecordingOutcome::Completed(audio)) => {
//!             audio.write_wav("note.wav".as_ref()).unwrap();
//!         }
//!         Ok(RecordingOutcome::Cancelled) => break,
//!         Err(e) => eprintln!("recording failed: {e}"),
//!     }
//! }
//! ```

pub mod session;
pub mod signal;

pub use session::{
    ArmOutcome, RecordedAudio, Recorder, RecordingError, RecordingOutcome, SessionState,
};
pub use signal::{parse_key, HotkeySignalHub, HotkeySource, Signal, SignalSource};

// test-only re-export so other modules' test code can script signals without
// reaching into `signal` directly.
#[cfg(test)]
pub use signal::ScriptedSignalSource;
