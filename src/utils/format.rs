//! Human-readable formatting for note metadata.

use chrono::{DateTime, Utc};

const WORDS_PER_MINUTE: f64 = 200.0;
const SIZE_UNITS: [&str; 9] = ["Bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Average reading time at 200 words per minute: `"Xm Ys"`, `"Xm"` or `"Ys"`.
pub fn calculate_reading_time(word_count: usize) -> String {
    let total_seconds = (word_count as f64 / WORDS_PER_MINUTE * 60.0).round() as u64;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;

    match (minutes, seconds) {
        (0, s) => format!("{s}s"),
        (m, 0) => format!("{m}m"),
        (m, s) => format!("{m}m {s}s"),
    }
}

/// Formats a byte count with a 1024 base, rounding up to a whole unit.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut scale = 1u128;
    while unit + 1 < SIZE_UNITS.len() && u128::from(bytes) >= scale * 1024 {
        scale *= 1024;
        unit += 1;
    }

    let value = (bytes as f64 / scale as f64).ceil();
    format!("{} {}", value, SIZE_UNITS[unit])
}

/// Coarse relative time, e.g. `"3 minutes ago"`. Days is the largest unit.
pub fn format_time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    let (amount, unit) = if days > 0 {
        (days, "day")
    } else if hours > 0 {
        (hours, "hour")
    } else if minutes > 0 {
        (minutes, "minute")
    } else {
        (seconds, "second")
    };
    let plural = if amount > 1 { "s" } else { "" };
    format!("{amount} {unit}{plural} ago")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_reading_time() {
        assert_eq!(calculate_reading_time(0), "0s");
        assert_eq!(calculate_reading_time(100), "30s");
        assert_eq!(calculate_reading_time(200), "1m");
        assert_eq!(calculate_reading_time(250), "1m 15s");
    }

    #[test]
    fn test_file_size() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(1023), "1023 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "2 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024 * 1024), "5 GB");
    }

    #[test]
    fn test_time_ago() {
        let now = Utc::now();
        assert_eq!(format_time_ago(now, now), "0 second ago");
        assert_eq!(format_time_ago(now - Duration::seconds(90), now), "1 minute ago");
        assert_eq!(format_time_ago(now - Duration::hours(5), now), "5 hours ago");
        assert_eq!(format_time_ago(now - Duration::days(2), now), "2 days ago");
        assert_eq!(format_time_ago(now - Duration::days(400), now), "400 days ago");
        assert_eq!(format_time_ago(now + Duration::minutes(3), now), "0 second ago");
    }
}
