#![deny(unsafe_code)]

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{CodeLabel, FieldType, PatientKey, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    /// The patient key column.
    Key,
    /// A canonical schema field.
    Field,
    /// A column derived from the genomic profile.
    Genomic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    pub role: ColumnRole,
    pub group: String,
    pub table: String,
    pub codes: Vec<CodeLabel>,
}

impl Column {
    /// Label of a category code, if the column declares one.
    pub fn code_label(&self, code: &str) -> Option<&str> {
        self.codes
            .iter()
            .find(|entry| entry.code == code)
            .map(|entry| entry.label.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    pub key: PatientKey,
    /// One value per column, in column order.
    pub values: Vec<Value>,
}

/// The assembled output table handed to exporters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub columns: Vec<Column>,
    pub rows: Vec<DatasetRow>,
}

impl Dataset {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: DatasetRow) {
        debug_assert_eq!(row.values.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.name.as_str()).collect()
    }

    pub fn row(&self, key: &PatientKey) -> Option<&DatasetRow> {
        self.rows.iter().find(|row| &row.key == key)
    }

    /// Value of `column` for `key`; `None` when either is unknown.
    pub fn value(&self, key: &PatientKey, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.row(key).and_then(|row| row.values.get(index))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// SHA-256 (hex) over column names, types and every rendered value.
    ///
    /// Every piece is length-prefixed and absent values carry their own tag,
    /// so an absent cell never hashes like an empty string.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for column in &self.columns {
            update_piece(&mut hasher, b'c', column.name.as_bytes());
            update_piece(&mut hasher, b't', column.field_type.as_str().as_bytes());
        }
        for row in &self.rows {
            update_piece(&mut hasher, b'r', row.key.as_str().as_bytes());
            for value in &row.values {
                match value.render() {
                    Some(text) => update_piece(&mut hasher, b'v', text.as_bytes()),
                    None => update_piece(&mut hasher, b'a', &[]),
                }
            }
        }
        hex::encode(hasher.finalize())
    }
}

fn update_piece(hasher: &mut Sha256, tag: u8, bytes: &[u8]) {
    hasher.update([tag]);
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}
