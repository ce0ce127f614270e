//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//! `BackendKind` and `ComputePrecision` also implement `FromStr` so clap can
//! parse them straight from command-line flags.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// BackendKind
// ---------------------------------------------------------------------------

/// Selects which transcription backend handles the session audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Offline whisper-rs inference against a local GGML model.
    Local,
    /// OpenAI's hosted audio transcription API.
    OpenAi,
}

impl Default for BackendKind {
    fn default() -> Self {
        Self::Local
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "openai" => Ok(Self::OpenAi),
            other => Err(format!("unknown backend '{other}' (expected: local, openai)")),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::OpenAi => write!(f, "openai"),
        }
    }
}

// ---------------------------------------------------------------------------
// ComputePrecision
// ---------------------------------------------------------------------------

/// Numeric precision mode for local inference.
///
/// Selects the GGML model file variant: `int8` uses the `q8_0` quantisation,
/// `float16` the stock half-precision file, `float32` a full-precision
/// conversion.  When the variant file is absent the backend falls back to
/// the plain `ggml-<size>.bin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputePrecision {
    Int8,
    Float16,
    Float32,
}

impl ComputePrecision {
    /// Filename suffix of the matching model variant.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            Self::Int8 => "-q8_0",
            Self::Float16 => "",
            Self::Float32 => "-f32",
        }
    }
}

impl Default for ComputePrecision {
    fn default() -> Self {
        Self::Int8
    }
}

impl FromStr for ComputePrecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "int8" => Ok(Self::Int8),
            "float16" => Ok(Self::Float16),
            "float32" => Ok(Self::Float32),
            other => Err(format!(
                "unknown precision '{other}' (expected: int8, float16, float32)"
            )),
        }
    }
}

impl std::fmt::Display for ComputePrecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int8 => write!(f, "int8"),
            Self::Float16 => write!(f, "float16"),
            Self::Float32 => write!(f, "float32"),
        }
    }
}

// ---------------------------------------------------------------------------
// LocalModelConfig
// ---------------------------------------------------------------------------

/// Settings for the local whisper-rs backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalModelConfig {
    /// Whisper model size (`tiny`, `base`, `small`, `medium`, `large`).
    pub model_size: String,
    /// Directory holding GGML model files.  `None` resolves to the
    /// platform models dir from [`AppPaths`].
    pub model_dir: Option<PathBuf>,
    /// Inference device: `"auto"` (default), `"cpu"` forces CPU-only.
    pub device: String,
    /// Numeric precision / model quantisation variant.
    pub precision: ComputePrecision,
    /// Trim leading/trailing silence before inference.
    pub vad_filter: bool,
    /// RMS threshold for the silence trimmer (only used when `vad_filter`).
    pub vad_threshold: f32,
}

impl Default for LocalModelConfig {
    fn default() -> Self {
        Self {
            model_size: "small".into(),
            model_dir: None,
            device: "auto".into(),
            precision: ComputePrecision::default(),
            vad_filter: true,
            vad_threshold: 0.01,
        }
    }
}

// ---------------------------------------------------------------------------
// OpenAiConfig
// ---------------------------------------------------------------------------

/// Settings for the OpenAI audio transcription backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Model name sent to the API.
    pub model: String,
    /// Base URL of the API endpoint.
    pub base_url: String,
    /// API key.  `None` falls back to the `OPENAI_API_KEY` environment
    /// variable; a missing credential is a configuration error at backend
    /// construction time.
    pub api_key: Option<String>,
    /// Maximum seconds to wait for a response before timing out.
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini-transcribe".into(),
            base_url: "https://api.openai.com".into(),
            api_key: None,
            timeout_secs: 120,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Capture format requested from the microphone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Requested sample rate in Hz.
    pub sample_rate: u32,
    /// Requested channel count (1 = mono).
    pub channels: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// OutputConfig
// ---------------------------------------------------------------------------

/// Where and how markdown transcripts are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for `transcript-*.md` files (created if missing).
    pub dir: PathBuf,
    /// Include the per-segment `## Timeline` section.
    pub include_segments: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("transcripts"),
            include_segments: true,
        }
    }
}

// ---------------------------------------------------------------------------
// HotkeyConfig
// ---------------------------------------------------------------------------

/// Key bindings for the recording session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotkeyConfig {
    /// Key that starts and stops a recording (e.g. `"Space"`).
    pub record_key: String,
    /// Key that cancels the session (e.g. `"Escape"`).
    pub cancel_key: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            record_key: "Space".into(),
            cancel_key: "Escape".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use voice_notes::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Selected transcription backend.
    pub backend: BackendKind,
    /// Forced language code (e.g. `"de"`); `None` = automatic detection.
    pub language: Option<String>,
    /// Capture format.
    pub audio: AudioConfig,
    /// Markdown output settings.
    pub output: OutputConfig,
    /// Key bindings.
    pub hotkey: HotkeyConfig,
    /// Local backend settings.
    pub local: LocalModelConfig,
    /// OpenAI backend settings.
    pub openai: OpenAiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Verify that a default `AppConfig` can be serialised to TOML and
    /// deserialised back without any data loss.
    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.backend, loaded.backend);
        assert_eq!(original.language, loaded.language);
        assert_eq!(original.audio.sample_rate, loaded.audio.sample_rate);
        assert_eq!(original.audio.channels, loaded.audio.channels);
        assert_eq!(original.output.dir, loaded.output.dir);
        assert_eq!(original.output.include_segments, loaded.output.include_segments);
        assert_eq!(original.hotkey.record_key, loaded.hotkey.record_key);
        assert_eq!(original.local.model_size, loaded.local.model_size);
        assert_eq!(original.local.precision, loaded.local.precision);
        assert_eq!(original.local.vad_filter, loaded.local.vad_filter);
        assert_eq!(original.openai.model, loaded.openai.model);
        assert_eq!(original.openai.api_key, loaded.openai.api_key);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");

        assert_eq!(config.backend, BackendKind::Local);
        assert_eq!(config.local.model_size, "small");
        assert_eq!(config.audio.sample_rate, 16_000);
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.backend, BackendKind::Local);
        assert!(cfg.language.is_none());
        assert_eq!(cfg.audio.sample_rate, 16_000);
        assert_eq!(cfg.audio.channels, 1);
        assert_eq!(cfg.output.dir, PathBuf::from("transcripts"));
        assert!(cfg.output.include_segments);
        assert_eq!(cfg.hotkey.record_key, "Space");
        assert_eq!(cfg.hotkey.cancel_key, "Escape");
        assert_eq!(cfg.local.model_size, "small");
        assert_eq!(cfg.local.device, "auto");
        assert_eq!(cfg.local.precision, ComputePrecision::Int8);
        assert!(cfg.local.vad_filter);
        assert_eq!(cfg.openai.model, "gpt-4o-mini-transcribe");
        assert!(cfg.openai.api_key.is_none());
    }

    /// Verify that modified non-default values survive a round trip.
    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.backend = BackendKind::OpenAi;
        cfg.language = Some("de".into());
        cfg.local.model_size = "medium".into();
        cfg.local.precision = ComputePrecision::Float16;
        cfg.local.vad_filter = false;
        cfg.openai.api_key = Some("sk-test".into());
        cfg.openai.timeout_secs = 30;
        cfg.output.include_segments = false;
        cfg.hotkey.record_key = "F9".into();

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.backend, BackendKind::OpenAi);
        assert_eq!(loaded.language, Some("de".into()));
        assert_eq!(loaded.local.model_size, "medium");
        assert_eq!(loaded.local.precision, ComputePrecision::Float16);
        assert!(!loaded.local.vad_filter);
        assert_eq!(loaded.openai.api_key, Some("sk-test".into()));
        assert_eq!(loaded.openai.timeout_secs, 30);
        assert!(!loaded.output.include_segments);
        assert_eq!(loaded.hotkey.record_key, "F9");
    }

    // ---- FromStr parsing ---------------------------------------------------

    #[test]
    fn backend_kind_from_str() {
        assert_eq!("local".parse::<BackendKind>(), Ok(BackendKind::Local));
        assert_eq!("OpenAI".parse::<BackendKind>(), Ok(BackendKind::OpenAi));
        assert!("whisperx".parse::<BackendKind>().is_err());
    }

    #[test]
    fn precision_from_str_and_suffix() {
        assert_eq!(
            "int8".parse::<ComputePrecision>(),
            Ok(ComputePrecision::Int8)
        );
        assert_eq!(ComputePrecision::Int8.file_suffix(), "-q8_0");
        assert_eq!(ComputePrecision::Float16.file_suffix(), "");
        assert_eq!(ComputePrecision::Float32.file_suffix(), "-f32");
        assert!("fp8".parse::<ComputePrecision>().is_err());
    }
}
