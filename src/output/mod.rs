//! Transcript output — markdown rendering and file naming.

pub mod markdown;

pub use markdown::{format_seconds, render_markdown, transcript_file_name};
