//! Parsing of human-readable size and duration strings.
//!
//! Configuration values like `TEMPSTORE_MAX_STORAGE=20GB` or
//! `TEMPSTORE_CLEAN_INTERVAL=15m` come in as strings; this module turns
//! them into bytes and seconds, and formats byte counts for display.

use crate::{Result, TempstoreError};

/// Parse a size string into a byte count.
///
/// Accepts a bare integer (bytes) or an integer with a `KB`, `MB` or `GB`
/// suffix (case-insensitive). Whitespace around the value is ignored.
pub fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_uppercase();

    let (number, multiplier) = if let Some(n) = s.strip_suffix("GB") {
        (n.trim().to_string(), 1024 * 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("MB") {
        (n.trim().to_string(), 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("KB") {
        (n.trim().to_string(), 1024)
    } else if let Some(n) = s.strip_suffix('B') {
        (n.trim().to_string(), 1)
    } else {
        (s.clone(), 1)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| TempstoreError::Validation(format!("invalid size string: {s:?}")))?;

    value
        .checked_mul(multiplier)
        .ok_or_else(|| TempstoreError::Validation(format!("size out of range: {s:?}")))
}

/// Parse a duration string into seconds.
///
/// Accepts a bare integer (seconds) or an integer with an `s`, `m`, `h`
/// or `d` suffix (case-insensitive).
pub fn parse_duration(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();

    let (number, multiplier) = if let Some(n) = s.strip_suffix('d') {
        (n.trim().to_string(), 86_400)
    } else if let Some(n) = s.strip_suffix('h') {
        (n.trim().to_string(), 3_600)
    } else if let Some(n) = s.strip_suffix('m') {
        (n.trim().to_string(), 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n.trim().to_string(), 1)
    } else {
        (s.clone(), 1)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| TempstoreError::Validation(format!("invalid duration string: {s:?}")))?;

    value
        .checked_mul(multiplier)
        .ok_or_else(|| TempstoreError::Validation(format!("duration out of range: {s:?}")))
}

/// Format a byte count for display, e.g. `1.5MB`.
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if size < 1024.0 {
            return format!("{size:.1}{unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1}PB")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_bare_bytes() {
        assert_eq!(parse_size("12345").unwrap(), 12345);
        assert_eq!(parse_size("0").unwrap(), 0);
    }

    #[test]
    fn test_parse_size_suffixes() {
        assert_eq!(parse_size("100KB").unwrap(), 100 * 1024);
        assert_eq!(parse_size("512MB").unwrap(), 512 * 1024 * 1024);
        assert_eq!(parse_size("20GB").unwrap(), 20 * 1024 * 1024 * 1024);
        assert_eq!(parse_size("64B").unwrap(), 64);
    }

    #[test]
    fn test_parse_size_case_and_whitespace() {
        assert_eq!(parse_size("1gb").unwrap(), 1024 * 1024 * 1024);
        assert_eq!(parse_size("  2 MB ").unwrap(), 2 * 1024 * 1024);
    }

    #[test]
    fn test_parse_size_invalid() {
        assert!(parse_size("").is_err());
        assert!(parse_size("GB").is_err());
        assert!(parse_size("ten MB").is_err());
        assert!(parse_size("-1GB").is_err());
    }

    #[test]
    fn test_parse_size_overflow() {
        assert!(parse_size("99999999999999999999GB").is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("90").unwrap(), 90);
        assert_eq!(parse_duration("30s").unwrap(), 30);
        assert_eq!(parse_duration("15m").unwrap(), 900);
        assert_eq!(parse_duration("2h").unwrap(), 7200);
        assert_eq!(parse_duration("1d").unwrap(), 86_400);
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0.0B");
        assert_eq!(format_size(512), "512.0B");
        assert_eq!(format_size(1536), "1.5KB");
        assert_eq!(format_size(10 * 1024 * 1024), "10.0MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0GB");
    }

    #[test]
    fn test_size_round_trip_through_format() {
        // parse accepts what format produces for whole unit counts
        assert_eq!(parse_size("10.0MB".replace(".0", "").as_str()).unwrap(), 10 * 1024 * 1024);
    }
}
