use chrono::NaiveDateTime;
use std::time::Instant;
use tracing::info;

/// Sortable, fixed-width stamp used in artifact and log file names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A simple wall-clock timer for logging elapsed time.
pub struct Timer {
    label: String,
    start: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        info!("⏱  Starting: {}", label);
        Self {
            label,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!(
            "⏱  Finished: {} (took {:.2?})",
            self.label,
            self.start.elapsed()
        );
    }
}

pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn now_local() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Replace characters that are illegal in file names with `_`.
/// "BRK/B" → "BRK_B" | "a:b?" → "a_b_" | ".." → "_"
pub fn sanitize_segment(s: &str) -> String {
    if !s.is_empty() && s.chars().all(|c| c == '.') {
        return "_".to_string();
    }
    s.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
