use chrono::{DateTime, Utc};

/// `m:ss`, minutes unbounded
pub fn format_duration(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Megabytes with one decimal, e.g. `4.3MB`
pub fn format_size(bytes: u64) -> String {
    format!("{:.1}MB", bytes as f64 / 1024.0 / 1024.0)
}

/// Name given to a recording stopped at `at`, e.g. `REC_2023-10-27_12_30_45.wav`
pub fn recording_filename(at: DateTime<Utc>) -> String {
    format!("REC_{}.wav", at.format("%Y-%m-%d_%H_%M_%S"))
}
