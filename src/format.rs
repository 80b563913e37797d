//! Formatting helpers for byte sizes, transfer rates, durations and percentages.

use std::time::Duration;

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Splits a byte count into a scaled value and a base-1024 unit.
///
/// The unit is the largest one where the scaled value is at least 1. Below GB
/// the value is rounded to an integer; at GB and above it keeps two decimal
/// digits, computed through a 100x integer scale to avoid float artifacts.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
#[must_use]
pub fn scale_bytes(bytes: u64) -> (f64, &'static str) {
    if bytes == 0 {
        return (0.0, "B");
    }
    let mut exp = 0usize;
    let mut n = bytes;
    while n >= 1024 && exp < UNITS.len() - 1 {
        n /= 1024;
        exp += 1;
    }
    let ratio = if exp >= 3 { 100.0 } else { 1.0 };
    let value = (bytes as f64 * ratio / 1024f64.powi(exp as i32)).round() / ratio;
    (value, UNITS[exp])
}

/// Formats a byte count as a human-readable string (e.g. "512 B", "1.50 GB").
#[must_use]
pub fn format_size(bytes: u64) -> String {
    let (value, unit) = scale_bytes(bytes);
    format!("{value} {unit}")
}

/// Formats a transfer rate in bytes per second.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn format_speed(bytes_per_sec: f64) -> String {
    let (value, unit) = scale_bytes(bytes_per_sec.max(0.0) as u64);
    format!("{value} {unit}/s")
}

/// Formats a duration as `HH:MM:SS`.
#[must_use]
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

/// Formats a percentage with one decimal above 10 and two at or below.
#[must_use]
pub fn format_percent(percent: f64) -> String {
    if percent > 10.0 {
        format!("{percent:.1}%")
    } else {
        format!("{percent:.2}%")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_bytes_units() {
        assert_eq!(scale_bytes(0), (0.0, "B"));
        assert_eq!(scale_bytes(500), (500.0, "B"));
        assert_eq!(scale_bytes(1023), (1023.0, "B"));
        assert_eq!(scale_bytes(1024), (1.0, "KB"));
        // integer rounding below GB
        assert_eq!(scale_bytes(1536), (2.0, "KB"));
        assert_eq!(scale_bytes(5 * 1024 * 1024), (5.0, "MB"));
    }

    #[test]
    fn scale_bytes_two_decimals_at_gb() {
        let (value, unit) = scale_bytes(1_610_612_736); // 1.5 GiB
        assert_eq!(unit, "GB");
        assert!((value - 1.5).abs() < f64::EPSILON);

        let (value, unit) = scale_bytes(1024u64.pow(4));
        assert_eq!(unit, "TB");
        assert!((value - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn format_size_display() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1024), "1 KB");
        assert_eq!(format_size(1_610_612_736), "1.5 GB");
    }

    #[test]
    fn format_speed_display() {
        assert_eq!(format_speed(1024.0), "1 KB/s");
        assert_eq!(format_speed(-5.0), "0 B/s");
    }

    #[test]
    fn format_duration_hms() {
        assert_eq!(format_duration(Duration::ZERO), "00:00:00");
        assert_eq!(format_duration(Duration::from_secs(65)), "00:01:05");
        assert_eq!(format_duration(Duration::from_secs(3665)), "01:01:05");
    }

    #[test]
    fn format_percent_precision() {
        assert_eq!(format_percent(45.26), "45.3%");
        assert_eq!(format_percent(9.876), "9.88%");
        assert_eq!(format_percent(10.0), "10.00%");
        assert_eq!(format_percent(100.0), "100.0%");
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn scale_bytes_never_panics(bytes in 0u64..u64::MAX) {
                let (value, _) = scale_bytes(bytes);
                prop_assert!(value >= 0.0);
            }

            #[test]
            fn scale_bytes_value_bounded_below_tb(bytes in 0u64..1_000_000_000_000u64) {
                // below TB the scaled value never exceeds 1024 (rounding may hit it exactly)
                let (value, _) = scale_bytes(bytes);
                prop_assert!(value <= 1024.0);
            }

            #[test]
            fn format_duration_never_panics(secs in 0u64..1_000_000) {
                let _ = format_duration(Duration::from_secs(secs));
            }

            #[test]
            fn format_percent_never_panics(p in 0.0f64..100.0) {
                let _ = format_percent(p);
            }
        }
    }
}
