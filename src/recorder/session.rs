//! Recording session controller.
//!
//! [`Recorder`] drives one capture session from "armed" to a terminal
//! outcome.  Three concurrent parties exist while recording:
//!
//! * the **capture producer** — the cpal callback thread pushing
//!   [`AudioChunk`]s into an unbounded mpsc channel;
//! * the **signal listener** — a thread blocked on the [`SignalSource`],
//!   which flips the shared stop/cancel flags when the user acts;
//! * the **controller** — this module's polling loop, the only consumer.
//!
//! The channel and the two atomic flags are the only state shared across the
//! concurrency boundary.  Each flag has exactly one writer (the listener) and
//! one reader (the controller), and the channel has one producer and one
//! consumer, so no further locking is needed.
//!
//! After the stop flag is observed the controller performs a final
//! non-blocking drain before closing the stream, so audio that was in flight
//! when the user pressed stop is never lost.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc, Arc,
};
use std::time::Duration;

use thiserror::Error;

use crate::audio::{wav, AudioCapture, AudioChunk, CaptureError, WavError};
use crate::recorder::signal::{Signal, SignalSource};

/// How long the controller's drain loop waits for a chunk before re-checking
/// the stop flag.  Bounded so a stop is always observed promptly.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// States of one recording session.
///
/// ```text
/// Idle ─▶ WaitingForStart ─▶ Recording ─▶ Completed
///                 │               ├─────▶ Cancelled
///                 ├─────────────▶ Cancelled
///                 └──────┬────────┴─────▶ Failed
/// ```
///
/// Transitions are forward-only; no state is revisited within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Session object exists; nothing has happened yet.
    Idle,
    /// Blocked on the signal source, waiting for Start (or Cancel).
    WaitingForStart,
    /// Microphone open; chunks are flowing into the frame buffer.
    Recording,
    /// Stop observed, waveform assembled and handed off.
    Completed,
    /// Cancel observed before or during capture; audio discarded.
    Cancelled,
    /// Capture failed (device error or no audio).
    Failed,
}

impl SessionState {
    /// Returns `true` for the three terminal states.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Cancelled | SessionState::Failed
        )
    }

    /// Returns `true` when `next` is a legal forward transition.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, WaitingForStart)
                | (WaitingForStart, Recording)
                | (WaitingForStart, Cancelled)
                | (WaitingForStart, Failed)
                | (Recording, Completed)
                | (Recording, Cancelled)
                | (Recording, Failed)
        )
    }

    /// Short human-readable label for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::WaitingForStart => "waiting-for-start",
            SessionState::Recording => "recording",
            SessionState::Completed => "completed",
            SessionState::Cancelled => "cancelled",
            SessionState::Failed => "failed",
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingError / outcome types
// ---------------------------------------------------------------------------

/// Capture-phase failures.  Disjoint from transcription errors — a failure
/// here never originates from a backend, and vice versa.
#[derive(Debug, Error)]
pub enum RecordingError {
    /// The stop signal arrived before any chunk was enqueued.  Retryable at
    /// the caller's discretion.
    #[error("no audio captured before stop; try again")]
    NoAudio,

    /// The capture device could not be opened or its stream failed.
    #[error("microphone capture failed: {0}")]
    Device(#[from] CaptureError),
}

/// The assembled waveform of a completed session.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedAudio {
    /// Interleaved f32 samples, chunk order preserved.
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
}

impl RecordedAudio {
    /// Recording length in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        let frames = self.samples.len() / self.channels as usize;
        frames as f32 / self.sample_rate as f32
    }

    /// Write this waveform to `path` as a 32-bit float PCM WAV.
    pub fn write_wav(&self, path: &std::path::Path) -> Result<(), WavError> {
        wav::write_wav(path, &self.samples, self.sample_rate, self.channels)
    }
}

/// Terminal result of a session that did not fail.
///
/// Cancellation is a normal exit path, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingOutcome {
    /// Stop observed with at least one chunk captured.
    Completed(RecordedAudio),
    /// Cancel observed before or during capture; any audio was discarded.
    Cancelled,
}

/// Result of the arming phase, before any device resource exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmOutcome {
    /// A start signal arrived; capture may begin.
    Started,
    /// A cancel signal arrived first; the session ends with no audio and no
    /// microphone ever opened.
    Cancelled,
}

// ---------------------------------------------------------------------------
// SessionFlags
// ---------------------------------------------------------------------------

/// The stop/cancel flag pair shared between listener and controller.
///
/// Single-writer discipline: only the listener thread sets flags, only the
/// controller reads them.  Cancel also sets stop so one check ends the drain
/// loop for both cases.
#[derive(Debug, Default)]
pub(crate) struct SessionFlags {
    stop: AtomicBool,
    cancel: AtomicBool,
}

impl SessionFlags {
    // Release/Acquire pairing: everything the writer did before setting stop
    // (including the cancel store) is visible once the controller observes it.
    pub(crate) fn signal_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub(crate) fn signal_cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
        self.stop.store(true, Ordering::Release);
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub(crate) fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Consumer loop
// ---------------------------------------------------------------------------

/// Pull chunks from the frame buffer until the stop flag is observed, then
/// perform the final non-blocking drain.
///
/// The flag is checked only *after* each receive attempt, and the drain runs
/// after the loop breaks, so a chunk enqueued in the same instant the flag
/// was set is still collected — no trailing audio is lost.
pub(crate) fn drain_until_stop(
    rx: &mpsc::Receiver<AudioChunk>,
    flags: &SessionFlags,
    poll_interval: Duration,
) -> Vec<AudioChunk> {
    let mut chunks = Vec::new();

    loop {
        match rx.recv_timeout(poll_interval) {
            Ok(chunk) => chunks.push(chunk),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            // Producer gone (stream handle dropped elsewhere) — nothing more
            // will arrive.
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        if flags.stop_requested() {
            break;
        }
    }

    // Final drain: whatever is still queued belongs to this session.
    while let Ok(chunk) = rx.try_recv() {
        chunks.push(chunk);
    }

    chunks
}

/// Concatenate captured chunks into one waveform, preserving arrival order.
pub(crate) fn assemble(chunks: Vec<AudioChunk>) -> Result<RecordedAudio, RecordingError> {
    let first = chunks.first().ok_or(RecordingError::NoAudio)?;
    let sample_rate = first.sample_rate;
    let channels = first.channels;

    let total: usize = chunks.iter().map(|c| c.samples.len()).sum();
    let mut samples = Vec::with_capacity(total);
    for chunk in &chunks {
        samples.extend_from_slice(&chunk.samples);
    }

    Ok(RecordedAudio {
        samples,
        sample_rate,
        channels,
    })
}

/// Spawn the stop/cancel listener thread.
///
/// The thread blocks on the signal source and sets exactly one of the two
/// flags before exiting.  Start signals during capture are ignored.  The
/// listener never touches the frame buffer, so the controller may abandon it
/// safely if the session ends for another reason.
fn spawn_listener<S: SignalSource + 'static>(
    mut source: S,
    flags: Arc<SessionFlags>,
) -> std::thread::JoinHandle<()> {
    std::thread::Builder::new()
        .name("signal-listener".into())
        .spawn(move || loop {
            match source.next_signal() {
                Signal::Stop => {
                    flags.signal_stop();
                    break;
                }
                Signal::Cancel => {
                    flags.signal_cancel();
                    break;
                }
                Signal::Start => continue,
            }
        })
        .expect("failed to spawn signal-listener thread")
}

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

/// Drives one capture session at a time from "armed" to a terminal outcome.
///
/// # Example
///
/// ```rust,no_run
/// use voice_notes::recorder::{HotkeySignalHub, Recorder, RecordingOutcome};
///
/// let hub = HotkeySignalHub::start(rdev::Key::Space, rdev::Key::Escape);
/// let recorder = Recorder::new(16_000, 1);
///
/// match recorder.record(hub.session_source()) {
///     Ok(RecordingOutcome::Completed(audio)) => {
///         println!("captured {:.2} s", audio.duration_secs());
///     }
///     Ok(RecordingOutcome::Cancelled) => println!("cancelled"),
///     Err(e) => eprintln!("recording failed: {e}"),
/// }
/// ```
pub struct Recorder {
    sample_rate: u32,
    channels: u16,
    poll_interval: Duration,
}

impl Recorder {
    /// Create a recorder requesting `sample_rate` Hz and `channels` channels
    /// from the capture device.
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Run one full session: wait for the start signal, capture until stop or
    /// cancel, and return the terminal outcome.
    ///
    /// # Errors
    ///
    /// [`RecordingError::NoAudio`] when stop arrived before any chunk (the
    /// caller may retry); [`RecordingError::Device`] when the microphone
    /// could not be opened or started (not retried here).
    pub fn record<S: SignalSource + 'static>(
        &self,
        mut source: S,
    ) -> Result<RecordingOutcome, RecordingError> {
        let mut state = SessionState::Idle;
        advance(&mut state, SessionState::WaitingForStart);

        match self.arm_and_wait_for_start(&mut source) {
            ArmOutcome::Cancelled => {
                advance(&mut state, SessionState::Cancelled);
                return Ok(RecordingOutcome::Cancelled);
            }
            ArmOutcome::Started => {}
        }

        advance(&mut state, SessionState::Recording);
        match self.run_capture(source) {
            Ok(RecordingOutcome::Completed(audio)) => {
                advance(&mut state, SessionState::Completed);
                Ok(RecordingOutcome::Completed(audio))
            }
            Ok(RecordingOutcome::Cancelled) => {
                advance(&mut state, SessionState::Cancelled);
                Ok(RecordingOutcome::Cancelled)
            }
            Err(e) => {
                advance(&mut state, SessionState::Failed);
                Err(e)
            }
        }
    }

    /// Block on the signal source until a start or cancel signal arrives.
    ///
    /// No microphone resource is opened during this phase.  Stop signals
    /// before a start are meaningless and ignored.
    pub fn arm_and_wait_for_start(&self, source: &mut dyn SignalSource) -> ArmOutcome {
        loop {
            match source.next_signal() {
                Signal::Start => return ArmOutcome::Started,
                Signal::Cancel => return ArmOutcome::Cancelled,
                Signal::Stop => continue,
            }
        }
    }

    /// Capture audio until a stop or cancel flag is observed.
    ///
    /// Opens the microphone stream, hands the signal source to the listener
    /// thread, and polls the frame buffer with a bounded timeout.  On stop,
    /// the remaining buffered chunks are drained non-blockingly before the
    /// RAII stream handle is dropped, so the device is released on every
    /// exit path.
    pub fn run_capture<S: SignalSource + 'static>(
        &self,
        source: S,
    ) -> Result<RecordingOutcome, RecordingError> {
        let (tx, rx) = mpsc::channel::<AudioChunk>();

        let capture = AudioCapture::open(self.sample_rate, self.channels)?;
        let handle = capture.start(tx)?;
        log::info!(
            "recording started ({} Hz, {} ch)",
            capture.sample_rate(),
            capture.channels()
        );

        let flags = Arc::new(SessionFlags::default());
        let _listener = spawn_listener(source, Arc::clone(&flags));

        let chunks = drain_until_stop(&rx, &flags, self.poll_interval);

        // Final drain has run; release the microphone before reporting.
        drop(handle);

        if flags.cancelled() {
            log::info!(
                "recording cancelled; {} buffered chunk(s) discarded",
                chunks.len()
            );
            return Ok(RecordingOutcome::Cancelled);
        }

        let audio = assemble(chunks)?;
        log::info!("recording stopped ({:.2} s captured)", audio.duration_secs());
        Ok(RecordingOutcome::Completed(audio))
    }
}

/// Log and apply a state transition, asserting legality in debug builds.
fn advance(state: &mut SessionState, next: SessionState) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal session transition: {} -> {}",
        state.label(),
        next.label()
    );
    log::debug!("session: {} -> {}", state.label(), next.label());
    *state = next;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::signal::ScriptedSignalSource;

    fn chunk(n: usize, fill: f32) -> AudioChunk {
        AudioChunk {
            samples: vec![fill; n],
            sample_rate: 16_000,
            channels: 1,
        }
    }

    // ---- drain_until_stop --------------------------------------------------

    #[test]
    fn drain_collects_all_chunks_in_order() {
        let (tx, rx) = mpsc::channel();
        let flags = Arc::new(SessionFlags::default());

        // Everything is enqueued before the flag is set, so nothing may be
        // lost regardless of interleaving.
        tx.send(chunk(1_600, 0.1)).unwrap();
        tx.send(chunk(1_600, 0.2)).unwrap();
        tx.send(chunk(800, 0.3)).unwrap();
        flags.signal_stop();

        let chunks = drain_until_stop(&rx, &flags, Duration::from_millis(10));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].samples[0], 0.1);
        assert_eq!(chunks[1].samples[0], 0.2);
        assert_eq!(chunks[2].samples[0], 0.3);
    }

    #[test]
    fn chunks_queued_after_stop_flag_are_still_drained() {
        let (tx, rx) = mpsc::channel();
        let flags = Arc::new(SessionFlags::default());

        // Flag first, then trailing audio — the final drain must pick it up.
        flags.signal_stop();
        tx.send(chunk(480, 0.4)).unwrap();
        tx.send(chunk(480, 0.5)).unwrap();

        let chunks = drain_until_stop(&rx, &flags, Duration::from_millis(10));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].samples[0], 0.5);
    }

    #[test]
    fn drain_with_concurrent_producer_loses_nothing() {
        let (tx, rx) = mpsc::channel();
        let flags = Arc::new(SessionFlags::default());
        let flags_producer = Arc::clone(&flags);

        let producer = std::thread::spawn(move || {
            for i in 0..20 {
                tx.send(chunk(160, i as f32 / 100.0)).unwrap();
            }
            flags_producer.signal_stop();
        });

        let chunks = drain_until_stop(&rx, &flags, Duration::from_millis(10));
        producer.join().unwrap();

        assert_eq!(chunks.len(), 20);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.samples[0], i as f32 / 100.0, "chunk {i} out of order");
        }
    }

    #[test]
    fn drain_exits_when_producer_disconnects() {
        let (tx, rx) = mpsc::channel();
        let flags = Arc::new(SessionFlags::default());

        tx.send(chunk(160, 0.7)).unwrap();
        drop(tx);

        let chunks = drain_until_stop(&rx, &flags, Duration::from_millis(10));
        assert_eq!(chunks.len(), 1);
    }

    // ---- assemble ----------------------------------------------------------

    #[test]
    fn assemble_sums_sample_counts() {
        // 1600 + 1600 + 800 samples at 16 kHz = 4000 samples = 0.25 s
        let chunks = vec![chunk(1_600, 0.0), chunk(1_600, 0.0), chunk(800, 0.0)];
        let audio = assemble(chunks).unwrap();
        assert_eq!(audio.samples.len(), 4_000);
        assert!((audio.duration_secs() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn assemble_preserves_chunk_order() {
        let chunks = vec![chunk(2, 0.1), chunk(2, 0.2), chunk(2, 0.3)];
        let audio = assemble(chunks).unwrap();
        assert_eq!(audio.samples, vec![0.1, 0.1, 0.2, 0.2, 0.3, 0.3]);
    }

    #[test]
    fn assemble_empty_is_no_audio_error() {
        let err = assemble(Vec::new()).unwrap_err();
        assert!(matches!(err, RecordingError::NoAudio));
        assert!(err.to_string().contains("no audio captured"));
    }

    #[test]
    fn stereo_duration_counts_frames_not_samples() {
        let audio = RecordedAudio {
            samples: vec![0.0; 32_000], // 16 000 frames of stereo
            sample_rate: 16_000,
            channels: 2,
        };
        assert!((audio.duration_secs() - 1.0).abs() < 1e-6);
    }

    // ---- arming ------------------------------------------------------------

    #[test]
    fn cancel_before_start_ends_session_without_device() {
        let recorder = Recorder::new(16_000, 1);
        // record() returns before run_capture, so no microphone is touched.
        let outcome = recorder
            .record(ScriptedSignalSource::immediate([Signal::Cancel]))
            .unwrap();
        assert_eq!(outcome, RecordingOutcome::Cancelled);
    }

    #[test]
    fn stop_before_start_is_ignored_while_arming() {
        let recorder = Recorder::new(16_000, 1);
        let mut source =
            ScriptedSignalSource::immediate([Signal::Stop, Signal::Stop, Signal::Cancel]);
        assert_eq!(
            recorder.arm_and_wait_for_start(&mut source),
            ArmOutcome::Cancelled
        );
    }

    #[test]
    fn start_signal_arms_the_session() {
        let recorder = Recorder::new(16_000, 1);
        let mut source = ScriptedSignalSource::immediate([Signal::Start]);
        assert_eq!(
            recorder.arm_and_wait_for_start(&mut source),
            ArmOutcome::Started
        );
    }

    // ---- listener thread ---------------------------------------------------

    #[test]
    fn listener_sets_stop_flag_only() {
        let flags = Arc::new(SessionFlags::default());
        let handle = spawn_listener(
            ScriptedSignalSource::immediate([Signal::Stop]),
            Arc::clone(&flags),
        );
        handle.join().unwrap();
        assert!(flags.stop_requested());
        assert!(!flags.cancelled());
    }

    #[test]
    fn listener_cancel_sets_both_flags() {
        let flags = Arc::new(SessionFlags::default());
        let handle = spawn_listener(
            ScriptedSignalSource::immediate([Signal::Cancel]),
            Arc::clone(&flags),
        );
        handle.join().unwrap();
        assert!(flags.stop_requested());
        assert!(flags.cancelled());
    }

    #[test]
    fn listener_ignores_start_during_capture() {
        let flags = Arc::new(SessionFlags::default());
        let handle = spawn_listener(
            ScriptedSignalSource::immediate([Signal::Start, Signal::Stop]),
            Arc::clone(&flags),
        );
        handle.join().unwrap();
        assert!(flags.stop_requested());
        assert!(!flags.cancelled());
    }

    // ---- SessionState ------------------------------------------------------

    #[test]
    fn forward_transitions_are_legal() {
        use SessionState::*;
        assert!(Idle.can_transition_to(WaitingForStart));
        assert!(WaitingForStart.can_transition_to(Recording));
        assert!(WaitingForStart.can_transition_to(Cancelled));
        assert!(Recording.can_transition_to(Completed));
        assert!(Recording.can_transition_to(Cancelled));
        assert!(Recording.can_transition_to(Failed));
    }

    #[test]
    fn backward_and_self_transitions_are_illegal() {
        use SessionState::*;
        assert!(!Recording.can_transition_to(WaitingForStart));
        assert!(!Completed.can_transition_to(Recording));
        assert!(!Recording.can_transition_to(Recording));
        assert!(!Cancelled.can_transition_to(Failed));
    }

    #[test]
    fn terminal_states() {
        use SessionState::*;
        assert!(Completed.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(Failed.is_terminal());
        assert!(!Idle.is_terminal());
        assert!(!WaitingForStart.is_terminal());
        assert!(!Recording.is_terminal());
    }
}
