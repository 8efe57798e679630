use std::time::Duration;

use anyhow::{bail, Result};

/// Suffix to milliseconds multiplier (order matters: longer suffixes first)
const UNITS: &[(&str, f64)] = &[
    ("ms", 1.0),
    ("s", 1_000.0),
    ("m", 60_000.0),
    ("h", 3_600_000.0),
];

/// Parse a polling interval like "500ms", "1s", "30m" or a bare millisecond
/// count like "1000".
pub fn parse_interval(s: &str) -> Result<Duration> {
    let s = s.trim();

    if let Ok(ms) = s.parse::<u64>() {
        return Ok(Duration::from_millis(ms));
    }

    for (suffix, multiplier) in UNITS {
        if let Some(val_str) = s.strip_suffix(suffix) {
            let val: f64 = val_str.trim().parse()?;
            if !val.is_finite() || val < 0.0 {
                bail!("Interval must be a non-negative number: {}", s);
            }
            return Ok(Duration::from_millis((val * multiplier) as u64));
        }
    }

    bail!("Unknown interval format: {}", s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_milliseconds() {
        assert_eq!(parse_interval("1000").unwrap(), Duration::from_secs(1));
    }

    #[test]
    fn test_parse_milliseconds() {
        assert_eq!(parse_interval("250ms").unwrap().as_millis(), 250);
    }

    #[test]
    fn test_parse_fractional_seconds() {
        assert_eq!(parse_interval("1.5s").unwrap().as_millis(), 1500);
    }

    #[test]
    fn test_parse_minutes() {
        assert_eq!(parse_interval("30m").unwrap().as_millis(), 1_800_000);
    }

    #[test]
    fn test_parse_with_whitespace() {
        assert_eq!(parse_interval("  2s ").unwrap().as_secs(), 2);
    }

    #[test]
    fn test_parse_unknown_format_fails() {
        assert!(parse_interval("10x").is_err());
        assert!(parse_interval("abcms").is_err());
        assert!(parse_interval("-1s").is_err());
    }
}
