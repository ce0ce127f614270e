//! Start/stop/cancel signal sources, backed by `rdev` global hotkeys.
//!
//! The session controller never assumes a specific input device — it only
//! consumes [`Signal`]s from a [`SignalSource`].  The production source is
//! [`HotkeySignalHub`]: a dedicated OS thread blocked inside `rdev::listen`
//! forwards key events over a channel, and per-session [`HotkeySource`]
//! handles translate record-key presses into alternating Start/Stop signals.
//!
//! `rdev::listen` is a blocking OS-level call with no graceful shutdown API;
//! it must run on its own OS thread.  Dropping the hub sets a stop flag so
//! the callback silently discards further events; the thread itself remains
//! blocked until the process exits, which is safe — it holds no resources
//! that need cleanup.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc, Arc, Mutex,
};

// ---------------------------------------------------------------------------
// Signal / SignalSource
// ---------------------------------------------------------------------------

/// One observable user event at the signal-source boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Begin capturing audio.
    Start,
    /// Stop capturing; keep the audio recorded so far.
    Stop,
    /// Abort the session; discard any audio.
    Cancel,
}

/// Blocking source of user signals.
///
/// `next_signal` suspends until the next signal arrives.  Implementations
/// must be `Send` — the session controller moves the source onto the
/// listener thread once capture begins.
pub trait SignalSource: Send {
    /// Block until the next [`Signal`] arrives.
    fn next_signal(&mut self) -> Signal;
}

// ---------------------------------------------------------------------------
// Key-name parsing
// ---------------------------------------------------------------------------

/// Parse a hotkey name from a config string into an [`rdev::Key`].
///
/// Supports the keys that make sense for record/cancel bindings: `Space`,
/// `Escape`, `Return`, F1–F12, and single ASCII letters.  Returns `None` for
/// unrecognised names so callers can fall back to a default.
///
/// # Examples
///
/// ```
/// use voice_notes::recorder::parse_key;
///
/// assert_eq!(parse_key("Space"),  Some(rdev::Key::Space));
/// assert_eq!(parse_key("Escape"), Some(rdev::Key::Escape));
/// assert_eq!(parse_key("F9"),     Some(rdev::Key::F9));
/// assert_eq!(parse_key("xyz"),    None);
/// ```
pub fn parse_key(key_str: &str) -> Option<rdev::Key> {
    match key_str {
        "Space" => Some(rdev::Key::Space),
        "Escape" | "Esc" => Some(rdev::Key::Escape),
        "Return" | "Enter" => Some(rdev::Key::Return),
        "Tab" => Some(rdev::Key::Tab),

        "F1" => Some(rdev::Key::F1),
        "F2" => Some(rdev::Key::F2),
        "F3" => Some(rdev::Key::F3),
        "F4" => Some(rdev::Key::F4),
        "F5" => Some(rdev::Key::F5),
        "F6" => Some(rdev::Key::F6),
        "F7" => Some(rdev::Key::F7),
        "F8" => Some(rdev::Key::F8),
        "F9" => Some(rdev::Key::F9),
        "F10" => Some(rdev::Key::F10),
        "F11" => Some(rdev::Key::F11),
        "F12" => Some(rdev::Key::F12),

        "A" | "a" => Some(rdev::Key::KeyA),
        "B" | "b" => Some(rdev::Key::KeyB),
        "C" | "c" => Some(rdev::Key::KeyC),
        "D" | "d" => Some(rdev::Key::KeyD),
        "E" | "e" => Some(rdev::Key::KeyE),
        "F" | "f" => Some(rdev::Key::KeyF),
        "G" | "g" => Some(rdev::Key::KeyG),
        "H" | "h" => Some(rdev::Key::KeyH),
        "I" | "i" => Some(rdev::Key::KeyI),
        "J" | "j" => Some(rdev::Key::KeyJ),
        "K" | "k" => Some(rdev::Key::KeyK),
        "L" | "l" => Some(rdev::Key::KeyL),
        "M" | "m" => Some(rdev::Key::KeyM),
        "N" | "n" => Some(rdev::Key::KeyN),
        "O" | "o" => Some(rdev::Key::KeyO),
        "P" | "p" => Some(rdev::Key::KeyP),
        "Q" | "q" => Some(rdev::Key::KeyQ),
        "R" | "r" => Some(rdev::Key::KeyR),
        "S" | "s" => Some(rdev::Key::KeyS),
        "T" | "t" => Some(rdev::Key::KeyT),
        "U" | "u" => Some(rdev::Key::KeyU),
        "V" | "v" => Some(rdev::Key::KeyV),
        "W" | "w" => Some(rdev::Key::KeyW),
        "X" | "x" => Some(rdev::Key::KeyX),
        "Y" | "y" => Some(rdev::Key::KeyY),
        "Z" | "z" => Some(rdev::Key::KeyZ),

        _ => None,
    }
}

// ---------------------------------------------------------------------------
// HotkeySignalHub
// ---------------------------------------------------------------------------

/// Raw key events forwarded from the rdev thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyEvent {
    Record,
    Cancel,
}

/// Process-wide hotkey listener that hands out per-session signal sources.
///
/// One hub lives for the whole CLI invocation.  [`HotkeySignalHub::start`]
/// spawns the rdev thread; [`HotkeySignalHub::session_source`] creates a
/// fresh [`HotkeySource`] whose first record-key press means Start.
///
/// # Usage
///
/// ```no_run
/// use voice_notes::recorder::{HotkeySignalHub, SignalSource};
///
/// let hub = HotkeySignalHub::start(rdev::Key::Space, rdev::Key::Escape);
/// let mut source = hub.session_source();
/// let signal = source.next_signal(); // blocks until Space or Escape
/// ```
pub struct HotkeySignalHub {
    rx: Arc<Mutex<mpsc::Receiver<KeyEvent>>>,
    /// Shared stop flag — set `true` on [`Drop`].
    stop: Arc<AtomicBool>,
    /// Kept so the thread is not detached prematurely; never joined because
    /// `rdev::listen` never returns.
    _thread: std::thread::JoinHandle<()>,
}

impl HotkeySignalHub {
    /// Spawn the dedicated rdev listener thread watching `record_key` and
    /// `cancel_key`.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to create the thread (extremely unlikely).
    pub fn start(record_key: rdev::Key, cancel_key: rdev::Key) -> Self {
        let (tx, rx) = mpsc::channel::<KeyEvent>();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("hotkey-listener".into())
            .spawn(move || {
                let result = rdev::listen(move |event| {
                    if stop_clone.load(Ordering::Relaxed) {
                        return;
                    }

                    match event.event_type {
                        rdev::EventType::KeyPress(k) if k == record_key => {
                            let _ = tx.send(KeyEvent::Record);
                        }
                        rdev::EventType::KeyPress(k) if k == cancel_key => {
                            let _ = tx.send(KeyEvent::Cancel);
                        }
                        _ => {}
                    }
                });

                if let Err(e) = result {
                    log::error!("hotkey-listener: rdev::listen exited with error: {e:?}");
                }
            })
            .expect("failed to spawn hotkey-listener thread");

        Self {
            rx: Arc::new(Mutex::new(rx)),
            stop,
            _thread: thread,
        }
    }

    /// Create a signal source for one recording session.
    ///
    /// Each source starts un-toggled: the first record-key press yields
    /// [`Signal::Start`], the next [`Signal::Stop`].
    pub fn session_source(&self) -> HotkeySource {
        HotkeySource {
            rx: Arc::clone(&self.rx),
            recording: false,
        }
    }
}

impl Drop for HotkeySignalHub {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        // The OS thread remains blocked inside rdev::listen until the
        // process exits; it forwards nothing once the flag is set.
    }
}

/// Per-session signal source handed out by [`HotkeySignalHub`].
pub struct HotkeySource {
    rx: Arc<Mutex<mpsc::Receiver<KeyEvent>>>,
    /// Toggled on each record-key press: `false` → next press is Start.
    recording: bool,
}

impl SignalSource for HotkeySource {
    fn next_signal(&mut self) -> Signal {
        // Only one session source blocks here at a time (one session at a
        // time per recorder), so holding the lock across recv is fine.
        let rx = match self.rx.lock() {
            Ok(guard) => guard,
            Err(_) => return Signal::Cancel, // hub thread panicked
        };

        match rx.recv() {
            Ok(KeyEvent::Record) => {
                if self.recording {
                    self.recording = false;
                    Signal::Stop
                } else {
                    self.recording = true;
                    Signal::Start
                }
            }
            Ok(KeyEvent::Cancel) => Signal::Cancel,
            // Hub dropped and its sender gone — treat as cancellation.
            Err(_) => Signal::Cancel,
        }
    }
}

// ---------------------------------------------------------------------------
// ScriptedSignalSource  (test-only)
// ---------------------------------------------------------------------------

/// A test double that plays back a fixed script of signals without any
/// keyboard involvement.
///
/// An exhausted script yields [`Signal::Cancel`] so an abandoned listener
/// thread can never wedge a test.
#[cfg(test)]
pub struct ScriptedSignalSource {
    steps: std::collections::VecDeque<Signal>,
}

#[cfg(test)]
impl ScriptedSignalSource {
    pub fn immediate(signals: impl IntoIterator<Item = Signal>) -> Self {
        Self {
            steps: signals.into_iter().collect(),
        }
    }
}

#[cfg(test)]
impl SignalSource for ScriptedSignalSource {
    fn next_signal(&mut self) -> Signal {
        self.steps.pop_front().unwrap_or(Signal::Cancel)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_record_and_cancel_defaults() {
        assert_eq!(parse_key("Space"), Some(rdev::Key::Space));
        assert_eq!(parse_key("Escape"), Some(rdev::Key::Escape));
        assert_eq!(parse_key("Esc"), Some(rdev::Key::Escape));
    }

    #[test]
    fn parse_function_and_letter_keys() {
        assert_eq!(parse_key("F9"), Some(rdev::Key::F9));
        assert_eq!(parse_key("r"), Some(rdev::Key::KeyR));
        assert_eq!(parse_key("R"), Some(rdev::Key::KeyR));
    }

    #[test]
    fn parse_unknown_key_returns_none() {
        assert_eq!(parse_key("xyz"), None);
        assert_eq!(parse_key(""), None);
        assert_eq!(parse_key("Ctrl+V"), None);
    }

    #[test]
    fn scripted_source_plays_back_in_order() {
        let mut source =
            ScriptedSignalSource::immediate([Signal::Start, Signal::Stop, Signal::Cancel]);
        assert_eq!(source.next_signal(), Signal::Start);
        assert_eq!(source.next_signal(), Signal::Stop);
        assert_eq!(source.next_signal(), Signal::Cancel);
    }

    #[test]
    fn exhausted_script_yields_cancel() {
        let mut source = ScriptedSignalSource::immediate([Signal::Start]);
        assert_eq!(source.next_signal(), Signal::Start);
        assert_eq!(source.next_signal(), Signal::Cancel);
        assert_eq!(source.next_signal(), Signal::Cancel);
    }

    #[test]
    fn signal_source_is_object_safe() {
        let source: Box<dyn SignalSource> =
            Box::new(ScriptedSignalSource::immediate([Signal::Cancel]));
        drop(source);
    }
}
