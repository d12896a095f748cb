//! Flat CSV export readable by general-purpose tools.
//!
//! Headers are column labels, category codes are replaced by their labels
//! and absent values are written as a configurable null string.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use mirador_model::{Column, Dataset, FieldType, Value};
use polars::prelude::{
    Column as FrameColumn, CsvWriter, DataFrame, IntoColumn, NamedFrom, SerWriter, Series,
};
use tracing::info;

use crate::common::ensure_parent_dir;

#[derive(Debug, Clone, Default)]
pub struct FlatCsvOptions {
    /// Text written for absent values; empty by default.
    pub null_string: String,
}

/// Header of each column: its label, or `label (NAME)` when two columns
/// share a label.
fn headers(columns: &[Column]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let duplicated: BTreeSet<&str> = columns
        .iter()
        .filter(|column| !seen.insert(column.label.as_str()))
        .map(|column| column.label.as_str())
        .collect();
    columns
        .iter()
        .map(|column| {
            if duplicated.contains(column.label.as_str()) {
                format!("{} ({})", column.label, column.name)
            } else {
                column.label.clone()
            }
        })
        .collect()
}

fn display_value(column: &Column, value: &Value) -> Option<String> {
    match value {
        Value::Category(code) if column.field_type == FieldType::Categorical => Some(
            column
                .code_label(code)
                .map_or_else(|| code.clone(), str::to_string),
        ),
        other => other.render(),
    }
}

/// Builds the flat table as a string-typed `DataFrame`; absent cells are null.
pub fn flat_frame(dataset: &Dataset) -> Result<DataFrame> {
    let columns: Vec<FrameColumn> = dataset
        .columns
        .iter()
        .zip(headers(&dataset.columns))
        .enumerate()
        .map(|(index, (column, header))| {
            let values: Vec<Option<String>> = dataset
                .rows
                .iter()
                .map(|row| row.values.get(index).and_then(|value| display_value(column, value)))
                .collect();
            Series::new(header.into(), values).into_column()
        })
        .collect();
    DataFrame::new(columns).context("build flat csv frame")
}

/// Writes the flat CSV to `path`.
pub fn write_flat_csv(path: &Path, dataset: &Dataset, options: &FlatCsvOptions) -> Result<()> {
    let mut frame = flat_frame(dataset)?;
    ensure_parent_dir(path)?;
    let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_null_value(options.null_string.clone())
        .finish(&mut frame)
        .with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), rows = frame.height(), "wrote flat csv");
    Ok(())
}
