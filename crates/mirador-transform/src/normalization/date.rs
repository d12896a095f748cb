//! Date normalization.

use chrono::NaiveDate;

/// Parses a trimmed cell with a `chrono` format string.
pub fn parse_date(value: &str, format: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, format).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_configured_formats() {
        let expected = NaiveDate::from_ymd_opt(2014, 6, 3);
        assert_eq!(parse_date("2014-06-03", "%Y-%m-%d"), expected);
        assert_eq!(parse_date("03/06/2014", "%d/%m/%Y"), expected);
    }

    #[test]
    fn rejects_mismatched_format() {
        assert_eq!(parse_date("2014-06-03", "%d/%m/%Y"), None);
        assert_eq!(parse_date("2014-02-30", "%Y-%m-%d"), None);
        assert_eq!(parse_date("   ", "%Y-%m-%d"), None);
    }
}
