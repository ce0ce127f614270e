//! Markdown rendering of transcription results.
//!
//! One note per session: a dated header, a metadata block, the transcript
//! body and (optionally) a per-segment timeline.  Rendering is pure — the
//! caller supplies the timestamp so output is reproducible in tests.

use chrono::{DateTime, Local};

use crate::transcribe::TranscriptionResult;

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render a transcription result as a markdown voice note.
///
/// `requested_language` is the language the user forced (`None` shows as
/// `auto`); the detected language falls back to `unknown`.  The timeline
/// section is skipped when `include_segments` is false or the result has no
/// segments.
pub fn render_markdown(
    result: &TranscriptionResult,
    requested_language: Option<&str>,
    include_segments: bool,
    timestamp: DateTime<Local>,
) -> String {
    let mut lines = vec![
        format!("# Voice Note {}", timestamp.format("%Y-%m-%d %H:%M:%S")),
        String::new(),
        "## Metadata".to_string(),
        format!("- Backend: {}", result.backend),
        format!(
            "- Requested language: {}",
            requested_language.unwrap_or("auto")
        ),
        format!(
            "- Detected language: {}",
            result.detected_language.as_deref().unwrap_or("unknown")
        ),
        format!("- Transcript length (chars): {}", result.text.chars().count()),
        String::new(),
        "## Transcript".to_string(),
        String::new(),
        result.text.trim().to_string(),
        String::new(),
    ];

    if include_segments && !result.segments.is_empty() {
        lines.push("## Timeline".to_string());
        lines.push(String::new());
        for segment in &result.segments {
            let start = format_seconds(segment.start);
            let end = format_seconds(segment.end);
            let snippet = segment.text.trim();
            match &segment.language {
                Some(lang) => {
                    lines.push(format!("- `{start} -> {end}` ({lang}) {snippet}"))
                }
                None => lines.push(format!("- `{start} -> {end}` {snippet}")),
            }
        }
        lines.push(String::new());
    }

    let mut rendered = lines.join("\n").trim().to_string();
    rendered.push('\n');
    rendered
}

/// Format seconds as `MM:SS.ss`, clamping negatives to zero.
pub fn format_seconds(value: f64) -> String {
    let total = value.max(0.0);
    let minutes = (total / 60.0).floor() as u64;
    let seconds = total - minutes as f64 * 60.0;
    format!("{minutes:02}:{seconds:05.2}")
}

/// File name for a transcript written at `timestamp`, e.g.
/// `transcript-20260828-143015.md`.
pub fn transcript_file_name(timestamp: DateTime<Local>) -> String {
    format!("transcript-{}.md", timestamp.format("%Y%m%d-%H%M%S"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
