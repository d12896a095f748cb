//! Source loading: tabular rows to source records.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use mirador_model::{
    LinkageError, MappingTable, RawValue, SourceKind, SourceName, SourceRecord, SourceRecordSet,
};
use tracing::info;

use crate::csv_table::read_delimited;
use crate::error::Result;

/// One input table before linkage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularSource {
    pub name: SourceName,
    pub kind: SourceKind,
    pub id_column: String,
    /// Column names in file order.
    pub headers: Vec<String>,
    /// Column → raw cell, one map per row.
    pub rows: Vec<BTreeMap<String, String>>,
}

/// Wraps each row of `source` into a [`SourceRecord`].
///
/// Blank cells become `Absent`; column names stay verbatim. A snapshot
/// source may not repeat a raw identifier. Rows with a blank identifier are
/// kept so linkage can report them.
pub fn load_source(source: TabularSource) -> std::result::Result<SourceRecordSet, LinkageError> {
    let source_name = source.name.to_string();
    if !source.headers.iter().any(|header| header == &source.id_column) {
        return Err(LinkageError::MissingIdColumn {
            source_name,
            column: source.id_column,
        });
    }
    let mut seen_columns = BTreeSet::new();
    for header in &source.headers {
        if !seen_columns.insert(header.as_str()) {
            return Err(LinkageError::MalformedSource {
                source_name,
                message: format!("column {header:?} appears more than once"),
            });
        }
    }

    let mut seen_ids = BTreeSet::new();
    let mut records = Vec::with_capacity(source.rows.len());
    for row in source.rows {
        let raw_id = row
            .get(&source.id_column)
            .map(|cell| cell.trim().to_string())
            .unwrap_or_default();
        if source.kind == SourceKind::Snapshot
            && !raw_id.is_empty()
            && !seen_ids.insert(raw_id.clone())
        {
            return Err(LinkageError::DuplicateIdentifier {
                source_name,
                raw_id,
            });
        }
        let cells = row
            .iter()
            .map(|(column, cell)| (column.clone(), RawValue::from_cell(cell)))
            .collect();
        records.push(SourceRecord {
            source: source.name.clone(),
            raw_id,
            cells,
        });
    }

    info!(
        source = %source.name,
        kind = ?source.kind,
        records = records.len(),
        columns = source.headers.len(),
        "loaded source"
    );
    Ok(SourceRecordSet {
        source: source.name,
        kind: source.kind,
        columns: source.headers,
        records,
    })
}

/// A configured source file and its column mappings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub name: SourceName,
    /// Absolute or config-relative path, already resolved.
    pub path: PathBuf,
    pub id_column: String,
    pub kind: SourceKind,
    /// Whether patients of this source belong to the cohort. Non-cohort
    /// sources only enrich patients defined elsewhere.
    pub cohort: bool,
    pub delimiter: u8,
    pub mapping: MappingTable,
}

impl SourceSpec {
    /// Reads the file and loads its records.
    pub fn load(&self) -> Result<SourceRecordSet> {
        let table = read_delimited(&self.path, self.delimiter)?;
        let tabular = table.into_source(self.name.clone(), self.kind, self.id_column.clone());
        Ok(load_source(tabular)?)
    }
}
