//! General utilities shared across the engine.

/// Formats a second count as `h:mm:ss` for display values such as the
/// remaining sleep-timer time.
#[must_use]
pub fn format_hms(total_secs: u64) -> String {
    let (mins, secs) = (total_secs / 60, total_secs % 60);
    let (hours, mins) = (mins / 60, mins % 60);
    format!("{}:{:02}:{:02}", hours, mins, secs)
}
