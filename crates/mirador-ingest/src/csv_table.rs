use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use mirador_model::{SourceKind, SourceName};

use crate::error::{IngestError, Result};
use crate::loader::TabularSource;

/// A delimited file read into memory: header row plus trimmed cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn normalize_header(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').trim().to_string()
}

fn normalize_cell(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

impl CsvTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Cells of `column`, one per row; `None` when the column is missing.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &str>> {
        let index = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(move |row| row.get(index).map_or("", String::as_str)),
        )
    }

    /// Turns the table into loader input, one column → cell map per row.
    pub fn into_source(
        self,
        name: SourceName,
        kind: SourceKind,
        id_column: impl Into<String>,
    ) -> TabularSource {
        let rows = self
            .rows
            .into_iter()
            .map(|row| {
                self.headers
                    .iter()
                    .cloned()
                    .zip(row)
                    .collect::<BTreeMap<String, String>>()
            })
            .collect();
        TabularSource {
            name,
            kind,
            id_column: id_column.into(),
            headers: self.headers,
            rows,
        }
    }
}

/// Reads a comma-separated file.
pub fn read_csv_table(path: &Path) -> Result<CsvTable> {
    read_delimited(path, b',')
}

/// Reads a delimited file; the first non-empty row is the header.
pub fn read_delimited(path: &Path, delimiter: u8) -> Result<CsvTable> {
    let file = std::fs::File::open(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table = parse_delimited(file, delimiter).map_err(|e| IngestError::from_csv(path, e))?;
    tracing::debug!(
        path = %path.display(),
        columns = table.headers.len(),
        rows = table.rows.len(),
        "read delimited table"
    );
    Ok(table)
}

/// Parses delimited text from any reader.
///
/// Records may be ragged: short rows are padded with empty cells and extra
/// cells beyond the header are dropped. Rows with only blank cells are
/// skipped.
pub fn parse_delimited<R: Read>(reader: R, delimiter: u8) -> csv::Result<CsvTable> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        match &headers {
            None => headers = Some(record.iter().map(normalize_header).collect()),
            Some(names) => {
                let mut row: Vec<String> = record.iter().map(normalize_cell).collect();
                row.resize(names.len(), String::new());
                rows.push(row);
            }
        }
    }
    Ok(CsvTable {
        headers: headers.unwrap_or_default(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_bom_and_pads_ragged_rows() {
        let text = "\u{feff}GID , Age,Outcome\n\nPT-07,34\nPT-08, 51 ,Died,extra\n";
        let table = parse_delimited(text.as_bytes(), b',').expect("parse");
        assert_eq!(table.headers, vec!["GID", "Age", "Outcome"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], vec!["PT-07", "34", ""]);
        assert_eq!(table.rows[1], vec!["PT-08", "51", "Died"]);
    }

    #[test]
    fn reads_tab_separated_columns() {
        let text = "sample\tlineage\tclassification\nG3686\tSL\t3.112\n";
        let table = parse_delimited(text.as_bytes(), b'\t').expect("parse");
        let codes: Vec<&str> = table.column("classification").expect("column").collect();
        assert_eq!(codes, vec!["3.112"]);
        assert!(table.column("missing").is_none());
    }

    #[test]
    fn empty_input_has_no_headers() {
        let table = parse_delimited("\n\n".as_bytes(), b',').expect("parse");
        assert!(table.headers.is_empty());
        assert!(table.rows.is_empty());
    }
}
