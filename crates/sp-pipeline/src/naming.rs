//! Output file names and size estimates.

/// `"<base>_segment_<index>.<ext>"`, with `index` the 1-based ordinal.
pub fn output_file_name(base: &str, index: usize, extension: &str) -> String {
    format!("{base}_segment_{index}.{extension}")
}

/// Rough output size in megabytes for `duration_secs` at a constant
/// `bitrate_kbps`: `duration * kbps / 8 / 1024`. For display only.
pub fn estimate_size_mb(duration_secs: f64, bitrate_kbps: u32) -> f64 {
    duration_secs.max(0.0) * f64::from(bitrate_kbps) / 8.0 / 1024.0
}
