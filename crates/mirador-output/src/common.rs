//! Shared helpers for the exporters.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mirador_model::{Column, ColumnRole, FieldType};

/// Default text for absent values in Mirador data files.
pub const MIRADOR_MISSING: &str = "\\N";

/// Ensure a parent directory exists for a file path.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    Ok(())
}

/// Ensure an output directory exists and return its path.
pub fn ensure_output_dir(dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir.to_path_buf())
}

/// Variable type as written in a Mirador dictionary.
pub fn mirador_type(column: &Column) -> &'static str {
    match column.field_type {
        FieldType::Numeric => "float",
        FieldType::Categorical => "category",
        FieldType::Date => "date",
        FieldType::Text => "String",
    }
}

/// Dictionary range of a column: `code:label;...` for categories, `label`
/// for the key column.
pub fn mirador_ranges(column: &Column) -> Option<String> {
    if column.role == ColumnRole::Key {
        return Some("label".to_string());
    }
    if column.field_type != FieldType::Categorical || column.codes.is_empty() {
        return None;
    }
    Some(
        column
            .codes
            .iter()
            .map(|entry| format!("{}:{}", entry.code, entry.label))
            .collect::<Vec<_>>()
            .join(";"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirador_model::CodeLabel;

    fn column(field_type: FieldType, role: ColumnRole, codes: Vec<CodeLabel>) -> Column {
        Column {
            name: "SEX".to_string(),
            label: "Sex".to_string(),
            field_type,
            role,
            group: "Demographics".to_string(),
            table: "Basic Information".to_string(),
            codes,
        }
    }

    #[test]
    fn ranges_follow_role_and_type() {
        let sex = column(
            FieldType::Categorical,
            ColumnRole::Field,
            vec![CodeLabel::new("1", "Female"), CodeLabel::new("2", "Male")],
        );
        assert_eq!(mirador_ranges(&sex).as_deref(), Some("1:Female;2:Male"));
        assert_eq!(mirador_type(&sex), "category");

        let key = column(FieldType::Text, ColumnRole::Key, Vec::new());
        assert_eq!(mirador_ranges(&key).as_deref(), Some("label"));
        assert_eq!(mirador_type(&key), "String");

        let age = column(FieldType::Numeric, ColumnRole::Field, Vec::new());
        assert_eq!(mirador_ranges(&age), None);
    }
}
