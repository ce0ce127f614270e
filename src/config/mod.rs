//! Configuration loading, persistence and platform paths.
//!
//! Settings live in a single `settings.toml` under the platform config
//! directory; [`AppPaths`] resolves the locations, [`AppConfig`] owns the
//! values and the TOML round trip.  Command-line flags override loaded
//! values field by field in `main`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, AudioConfig, BackendKind, ComputePrecision, HotkeyConfig, LocalModelConfig,
    OpenAiConfig, OutputConfig,
};
