//! Application entry point — voice-notes.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Parse command-line flags.
//! 3. Load [`AppConfig`] from disk (returns default on first run) and apply
//!    flag overrides.
//! 4. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 5. Build the selected [`Transcriber`] backend.
//! 6. Either transcribe a single input file, or run the interactive
//!    hotkey-driven recording loop until the user cancels.
//!
//! # Exit codes
//!
//! * `0` — normal exit (including user cancellation).
//! * `1` — recording device failure.
//! * `2` — backend construction or transcription failure.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use voice_notes::{
    config::{AppConfig, BackendKind, ComputePrecision},
    output::{render_markdown, transcript_file_name},
    recorder::{parse_key, HotkeySignalHub, RecordedAudio, Recorder, RecordingError, RecordingOutcome},
    transcribe::{build_transcriber, Transcriber},
};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

/// Record speech and save markdown transcripts, offline or via OpenAI.
#[derive(Debug, Parser)]
#[command(name = "voice-notes", version, about)]
struct Cli {
    /// Transcription backend: `local` (offline) or `openai` (cloud).
    #[arg(long)]
    backend: Option<BackendKind>,

    /// Force a language code (e.g. 'de' or 'en') instead of automatic
    /// detection.
    #[arg(long)]
    language: Option<String>,

    /// Directory where markdown transcripts are stored.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Path to an existing audio file (skip live recording).
    #[arg(long)]
    input_file: Option<PathBuf>,

    /// Local whisper model size (tiny, base, small, medium, large).
    #[arg(long)]
    model_size: Option<String>,

    /// Device override for local inference ('cpu' disables GPU).
    #[arg(long)]
    device: Option<String>,

    /// Local inference precision: int8, float16 or float32.
    #[arg(long)]
    precision: Option<ComputePrecision>,

    /// Model name to use with the OpenAI backend.
    #[arg(long)]
    openai_model: Option<String>,

    /// API key for the OpenAI backend.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Do not include per-segment timing details in the markdown output.
    #[arg(long)]
    no_segments: bool,
}

/// Fold command-line flags over the loaded configuration.  Flags win
/// field-by-field; anything not passed keeps the file/default value.
fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(language) = &cli.language {
        config.language = Some(language.clone());
    }
    if let Some(dir) = &cli.output_dir {
        config.output.dir = dir.clone();
    }
    if let Some(size) = &cli.model_size {
        config.local.model_size = size.clone();
    }
    if let Some(device) = &cli.device {
        config.local.device = device.clone();
    }
    if let Some(precision) = cli.precision {
        config.local.precision = precision;
    }
    if let Some(model) = &cli.openai_model {
        config.openai.model = model.clone();
    }
    if let Some(key) = &cli.openai_api_key {
        config.openai.api_key = Some(key.clone());
    }
    if cli.no_segments {
        config.output.include_segments = false;
    }
}

// ---------------------------------------------------------------------------
// Transcription + persistence
// ---------------------------------------------------------------------------

/// Transcribe one audio file, write the markdown note, and print a summary.
fn transcribe_and_save(
    rt: &tokio::runtime::Runtime,
    transcriber: &Arc<dyn Transcriber>,
    audio_path: &Path,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let language = config.language.as_deref();
    let result = rt.block_on(transcriber.transcribe(audio_path, language))?;

    let now = chrono::Local::now();
    let markdown = render_markdown(&result, language, config.output.include_segments, now);
    let output_path = config.output.dir.join(transcript_file_name(now));
    std::fs::write(&output_path, markdown)?;

    println!("Transcription complete!");
    println!("Saved markdown transcript to {}.", output_path.display());
    println!("Backend: {}", result.backend);
    println!("Requested language: {}", language.unwrap_or("auto"));
    println!(
        "Detected language: {}",
        result.detected_language.as_deref().unwrap_or("unknown")
    );

    println!("\nTranscript");
    let text = result.text.trim();
    if text.is_empty() {
        println!("(no transcript text returned)");
    } else {
        println!("{text}");
    }
    Ok(())
}

/// Persist a completed recording to a temp WAV file for the backends.
fn write_temp_wav(audio: &RecordedAudio) -> anyhow::Result<PathBuf> {
    let name = format!(
        "voice-note-{}.wav",
        chrono::Local::now().format("%Y%m%d-%H%M%S%.3f")
    );
    let path = std::env::temp_dir().join(name);
    audio.write_wav(&path)?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Interactive loop
// ---------------------------------------------------------------------------

/// Run recording sessions until the user cancels.
fn run_interactive(
    rt: &tokio::runtime::Runtime,
    transcriber: &Arc<dyn Transcriber>,
    config: &AppConfig,
) -> ExitCode {
    let record_key = parse_key(&config.hotkey.record_key).unwrap_or(rdev::Key::Space);
    let cancel_key = parse_key(&config.hotkey.cancel_key).unwrap_or(rdev::Key::Escape);

    let hub = HotkeySignalHub::start(record_key, cancel_key);
    let recorder = Recorder::new(config.audio.sample_rate, config.audio.channels);

    println!("Interactive recording session started.");
    println!(
        "Press {} to start/stop a note, {} to exit.",
        config.hotkey.record_key, config.hotkey.cancel_key
    );

    loop {
        let audio = match recorder.record(hub.session_source()) {
            Ok(RecordingOutcome::Completed(audio)) => audio,
            Ok(RecordingOutcome::Cancelled) => {
                println!("Recording session cancelled. Goodbye!");
                return ExitCode::SUCCESS;
            }
            Err(e @ RecordingError::NoAudio) => {
                eprintln!("Recording failed: {e}");
                continue;
            }
            Err(e) => {
                eprintln!("Recording failed: {e}");
                return ExitCode::from(1);
            }
        };

        log::info!(
            "captured {:.2}s of audio at {} Hz",
            audio.duration_secs(),
            audio.sample_rate
        );

        let temp_wav = match write_temp_wav(&audio) {
            Ok(path) => path,
            Err(e) => {
                eprintln!("Failed to write temporary audio file: {e}");
                return ExitCode::from(1);
            }
        };

        let outcome = transcribe_and_save(rt, transcriber, &temp_wav, config);
        if let Err(e) = std::fs::remove_file(&temp_wav) {
            log::warn!("could not remove temp file {}: {e}", temp_wav.display());
        }
        // A failed note does not end the session; the next one may succeed.
        if let Err(e) = outcome {
            eprintln!("Transcription failed: {e}");
        }

        println!(
            "\nPress {} to record another note or {} to exit.\n",
            config.hotkey.record_key, config.hotkey.cancel_key
        );
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Flags
    let cli = Cli::parse();

    // 3. Configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    apply_overrides(&mut config, &cli);

    if let Err(e) = std::fs::create_dir_all(&config.output.dir) {
        eprintln!(
            "Cannot create output directory {}: {e}",
            config.output.dir.display()
        );
        return ExitCode::from(1);
    }

    // 4. Tokio runtime (2 workers — inference and upload each take one)
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::from(1);
        }
    };

    // 5. Backend
    let transcriber = match build_transcriber(&config) {
        Ok(t) => {
            log::info!("using backend {}", t.backend_id());
            t
        }
        Err(e) => {
            eprintln!("Backend unavailable: {e}");
            return ExitCode::from(2);
        }
    };

    // 6. Single file or interactive session
    if let Some(input) = &cli.input_file {
        match transcribe_and_save(&rt, &transcriber, input, &config) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Transcription failed: {e}");
                ExitCode::from(2)
            }
        }
    } else {
        run_interactive(&rt, &transcriber, &config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
