//! Numeric normalization.

/// Parses a trimmed cell as a finite `f64`.
///
/// Thousands separators are not accepted; `NaN` and infinities are rejected.
pub fn parse_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|parsed| parsed.is_finite())
}
