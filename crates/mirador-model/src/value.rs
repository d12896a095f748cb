#![deny(unsafe_code)]

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::schema::FieldType;

/// A cell exactly as a source carried it, before any coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RawValue {
    Text(String),
    Number(f64),
    Absent,
}

impl RawValue {
    /// Converts a text cell; blank cells become `Absent`.
    pub fn from_cell(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self::Absent
        } else {
            Self::Text(trimmed.to_string())
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Text rendering used in diagnostics; `None` for absent cells.
    pub fn render(&self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text.clone()),
            Self::Number(number) => Some(format_number(*number)),
            Self::Absent => None,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render().unwrap_or_default())
    }
}

/// A resolved value in the canonical schema.
///
/// `Absent` is the explicit null marker: it never compares equal to zero or
/// to an empty string, and exporters map it to their own null convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Absent,
    Number(f64),
    Category(String),
    Date(NaiveDate),
    Text(String),
}

impl Value {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Self::Absent => None,
            Self::Number(_) => Some(FieldType::Numeric),
            Self::Category(_) => Some(FieldType::Categorical),
            Self::Date(_) => Some(FieldType::Date),
            Self::Text(_) => Some(FieldType::Text),
        }
    }

    /// Renders a present value as text; dates use ISO 8601 (`YYYY-MM-DD`).
    pub fn render(&self) -> Option<String> {
        match self {
            Self::Absent => None,
            Self::Number(number) => Some(format_number(*number)),
            Self::Category(code) => Some(code.clone()),
            Self::Date(date) => Some(date.format("%Y-%m-%d").to_string()),
            Self::Text(text) => Some(text.clone()),
        }
    }
}

/// Formats a floating-point number without a trailing `.0`.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // Folds -0.0 into 0.
        return "0".to_string();
    }
    format!("{value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_cells_are_absent() {
        assert_eq!(RawValue::from_cell("   "), RawValue::Absent);
        assert_eq!(RawValue::from_cell(" 34 "), RawValue::Text("34".to_string()));
    }

    #[test]
    fn absent_is_distinct_from_zero_and_empty() {
        assert_ne!(Value::Absent, Value::Number(0.0));
        assert_ne!(Value::Absent, Value::Text(String::new()));
        assert_eq!(Value::Text(String::new()).render(), Some(String::new()));
        assert_eq!(Value::Absent.render(), None);
    }

    #[test]
    fn numbers_render_without_trailing_zero() {
        assert_eq!(format_number(100.0), "100");
        assert_eq!(format_number(34.5), "34.5");
        assert_eq!(format_number(-0.0), "0");
    }

    #[test]
    fn dates_render_iso() {
        let date = NaiveDate::from_ymd_opt(2014, 6, 2).expect("date");
        assert_eq!(Value::Date(date).render().as_deref(), Some("2014-06-02"));
    }
}
