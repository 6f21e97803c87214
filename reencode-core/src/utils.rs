//! Utility functions for formatting and path classification.

use std::path::Path;
use std::time::Duration;

/// Container extensions recognized as source media (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "mkv", "avi", "webm", "flv", "wmv"];

/// Checks the extension only; no filesystem access.
#[must_use]
pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Formats a duration as HH:MM:SS (e.g., 3725s -> "01:02:05").
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Formats a frame rate for the ffmpeg `-r` argument and for display.
///
/// Uses up to three decimals and drops trailing zeros, so 30.0 -> "30" and
/// 30000/1001 -> "29.97".
#[must_use]
pub fn format_frame_rate(frame_rate: f64) -> String {
    let text = format!("{frame_rate:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    text.to_string()
}
