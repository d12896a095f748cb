#![deny(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{GenomicProfile, PatientKey, RawValue, SourceName, Value};

static ABSENT_RAW: RawValue = RawValue::Absent;
static ABSENT: Value = Value::Absent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// At most one row per patient.
    #[default]
    Snapshot,
    /// Repeated measurements: any number of rows per patient, in file order.
    Series,
}

/// One row of one input source, columns kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub source: SourceName,
    pub raw_id: String,
    pub cells: BTreeMap<String, RawValue>,
}

impl SourceRecord {
    /// The cell under `column`, `Absent` when the row has no such column.
    pub fn cell(&self, column: &str) -> &RawValue {
        self.cells.get(column).unwrap_or(&ABSENT_RAW)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecordSet {
    pub source: SourceName,
    pub kind: SourceKind,
    /// Column names in file order.
    pub columns: Vec<String>,
    /// Records in file order.
    pub records: Vec<SourceRecord>,
}

impl SourceRecordSet {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|candidate| candidate == column)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The unified per-patient entity.
///
/// `values` holds every schema field, `Absent` included, so rows built from
/// different patients always have the same keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub key: PatientKey,
    pub values: BTreeMap<String, Value>,
    /// Source that supplied each non-absent value.
    pub provenance: BTreeMap<String, SourceName>,
    pub genomic: Option<GenomicProfile>,
}

impl PatientRecord {
    pub fn value(&self, field: &str) -> &Value {
        self.values.get(field).unwrap_or(&ABSENT)
    }

    pub fn source_of(&self, field: &str) -> Option<&SourceName> {
        self.provenance.get(field)
    }
}
