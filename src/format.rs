use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const MONTH: u64 = 30 * DAY;
const YEAR: u64 = 12 * MONTH;

const UPTIME_UNITS: [(u64, &str); 6] = [
    (YEAR, "y"),
    (MONTH, "mo"),
    (DAY, "d"),
    (HOUR, "h"),
    (MINUTE, "m"),
    (1, "s"),
];

/// Render elapsed seconds as `1h 1m 1s`, using 30-day months and 360-day
/// years. Zero components are left out; zero seconds gives an empty string.
pub fn format_uptime(seconds: f64) -> String {
    let mut remaining = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };

    let mut parts = Vec::new();
    for (size, suffix) in UPTIME_UNITS {
        let value = remaining / size;
        remaining %= size;
        if value > 0 {
            parts.push(format!("{value}{suffix}"));
        }
    }
    parts.join(" ")
}

pub fn truncate_unicode(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width > max_width.saturating_sub(1) {
            result.push('\u{2026}');
            break;
        }
        result.push(ch);
        width += ch_width;
    }
    result
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    const GB: u64 = 1024 * 1024 * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.0} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
