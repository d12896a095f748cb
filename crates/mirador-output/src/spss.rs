//! SPSS control card written next to a copy of the data file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mirador_model::{Column, Dataset, FieldType};
use tracing::info;

use crate::common::ensure_parent_dir;
use crate::mirador::write_data;

/// Paths written by [`write_spss_outputs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpssFiles {
    pub data: PathBuf,
    pub card: PathBuf,
}

/// Widest rendered value of a column, at least one character.
fn text_width(dataset: &Dataset, index: usize, missing: &str) -> usize {
    dataset
        .rows
        .iter()
        .map(|row| {
            row.values
                .get(index)
                .and_then(mirador_model::Value::render)
                .map_or(missing.len(), |text| text.chars().count())
        })
        .max()
        .unwrap_or(0)
        .max(1)
}

fn spss_format(dataset: &Dataset, index: usize, missing: &str) -> String {
    match dataset.columns[index].field_type {
        FieldType::Numeric => "F".to_string(),
        FieldType::Date => "SDATE10".to_string(),
        FieldType::Categorical | FieldType::Text => {
            format!("A{}", text_width(dataset, index, missing))
        }
    }
}

fn is_string(column: &Column) -> bool {
    matches!(column.field_type, FieldType::Categorical | FieldType::Text)
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "'"))
}

/// Builds the control card: variable formats, labels, value labels and the
/// missing-value string of every text column.
pub fn spss_card(dataset: &Dataset, missing: &str) -> String {
    let mut card = String::new();
    card.push_str("DATA LIST LIST(',') /\n");
    for (index, column) in dataset.columns.iter().enumerate() {
        card.push_str(&format!(
            "  {} ({})\n",
            column.name,
            spss_format(dataset, index, missing)
        ));
    }
    card.push_str("  .\n");

    card.push_str("VARIABLE LABELS\n");
    for column in &dataset.columns {
        card.push_str(&format!("  {} {}\n", column.name, quote(&column.label)));
    }
    card.push_str("  .\n");

    card.push_str("VALUE LABELS\n");
    for column in dataset
        .columns
        .iter()
        .filter(|column| column.field_type == FieldType::Categorical && !column.codes.is_empty())
    {
        card.push_str(&format!("  {}\n", column.name));
        for entry in &column.codes {
            card.push_str(&format!("    '{}' {}\n", entry.code, quote(&entry.label)));
        }
        card.push_str("  /\n");
    }
    card.push_str("  .\n");

    card.push_str("MISSING VALUES\n");
    for column in dataset.columns.iter().filter(|column| is_string(column)) {
        card.push_str(&format!("  {} ('{missing}')\n", column.name));
    }
    card.push_str("  .\n");
    card
}

/// Writes the data file to `data_path` and the card beside it (`.spss`).
pub fn write_spss_outputs(data_path: &Path, dataset: &Dataset, missing: &str) -> Result<SpssFiles> {
    ensure_parent_dir(data_path)?;
    write_data(data_path, dataset, missing)?;
    let card = data_path.with_extension("spss");
    fs::write(&card, spss_card(dataset, missing))
        .with_context(|| format!("write {}", card.display()))?;
    info!(card = %card.display(), "wrote spss control card");
    Ok(SpssFiles {
        data: data_path.to_path_buf(),
        card,
    })
}
