// Display helpers for sizes and table cells

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Human-readable size, base 1024, two decimals above bytes
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// Truncate to `max_width` characters, marking the cut with "..."
pub fn truncate(s: &str, max_width: usize) -> String {
    if s.chars().count() <= max_width {
        s.to_string()
    } else if max_width > 3 {
        let kept: String = s.chars().take(max_width - 3).collect();
        format!("{}...", kept)
    } else {
        s.chars().take(max_width).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.00 GB");
        assert_eq!(format_size(2048 * 1024 * 1024 * 1024), "2048.00 GB");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short.wav", 20), "short.wav");
        assert_eq!(truncate("a-very-long-file-name.wav", 10), "a-very-...");
        assert_eq!(truncate("émotion", 3), "émo");
    }
}
