//! Byte/time humanization shared by the progress display and final summary
//! (spec.md §2 component L; SPEC_FULL.md §4 promotes the original's
//! `format_time_duration`/`format_file_size` glue into one place).

const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

/// Formats a byte count as e.g. `"1.5 MiB"`. Values under 1 KiB are shown
/// as a whole number of bytes.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit_idx = 0;
    while value >= 1024.0 && unit_idx < UNITS.len() - 1 {
        value /= 1024.0;
        unit_idx += 1;
    }
    format!("{value:.2} {}", UNITS[unit_idx])
}

/// Formats a byte-per-second rate as e.g. `"2.3 MiB/s"`.
pub fn format_rate(bytes_per_sec: f64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec.max(0.0) as u64))
}

/// Formats a duration in seconds as `H:MM:SS` (omitting hours when zero).
pub fn format_duration_secs(total_secs: f64) -> String {
    let total = total_secs.max(0.0).round() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}
