//! Formatting utilities for CLI output.
//!
//! Product names and descriptions are mostly CJK, which take two terminal
//! columns per character, so truncation works on display width.

use std::time::Duration;

/// Terminal columns taken by `c`.
fn char_width(c: char) -> usize {
    match c as u32 {
        0x1100..=0x115F
        | 0x2E80..=0x303E
        | 0x3041..=0x33FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xA000..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6 => 2,
        _ => 1,
    }
}

/// Terminal columns taken by `s`.
pub fn display_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

/// Truncate `s` to at most `max_width` columns, ending in `...` when cut.
///
/// # Examples
///
/// ```
/// use shopai_cli::ui::format::truncate_width;
///
/// assert_eq!(truncate_width("hello", 10), "hello");
/// assert_eq!(truncate_width("hello world", 8), "hello...");
/// assert_eq!(truncate_width("主动降噪无线蓝牙耳机", 9), "主动降...");
/// ```
pub fn truncate_width(s: &str, max_width: usize) -> String {
    if display_width(s) <= max_width {
        return s.to_string();
    }
    if max_width <= 3 {
        return ".".repeat(max_width);
    }

    let budget = max_width - 3;
    let mut used = 0;
    let mut out = String::new();
    for c in s.chars() {
        let w = char_width(c);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push_str("...");
    out
}

/// Short human duration: `850ms`, `1.2s`, `2m 5s`.
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis();
    if ms < 1_000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1_000.0)
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_width_counts_cjk_double() {
        assert_eq!(display_width("abc"), 3);
        assert_eq!(display_width("耳机"), 4);
        assert_eq!(display_width("¥199"), 4);
    }

    #[test]
    fn test_truncate_width_never_exceeds_budget() {
        for max in 0..12 {
            let out = truncate_width("跑步鞋 running shoes", max);
            assert!(display_width(&out) <= max, "{:?} at {}", out, max);
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(850)), "850ms");
        assert_eq!(format_duration(Duration::from_millis(1_240)), "1.2s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }
}
