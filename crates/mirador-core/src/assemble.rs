//! Dataset assembly: merged records to the typed output table.

use mirador_genomics::GenomicPanel;
use mirador_model::{
    CanonicalField, Column, ColumnRole, Dataset, DatasetRow, FieldType, PatientRecord,
    PipelineOptions, Schema, Value,
};
use mirador_transform::transform_enabled;
use tracing::{debug, info_span};

pub const KEY_LABEL: &str = "Patient ID";
pub const KEY_GROUP: &str = "Demographics";
pub const KEY_TABLE: &str = "Basic Information";
/// Group of fields that declare none.
pub const DEFAULT_GROUP: &str = "Other";

fn key_column(name: &str) -> Column {
    Column {
        name: name.to_string(),
        label: KEY_LABEL.to_string(),
        field_type: FieldType::Text,
        role: ColumnRole::Key,
        group: KEY_GROUP.to_string(),
        table: KEY_TABLE.to_string(),
        codes: Vec::new(),
    }
}

fn field_column(field: &CanonicalField, options: &PipelineOptions) -> Column {
    let mut label = field.title().to_string();
    if let Some(transform) = field.transform
        && transform_enabled(transform, options)
    {
        label.push_str(transform.unit_suffix());
    }
    let group = field.group.as_deref().unwrap_or(DEFAULT_GROUP);
    Column {
        name: field.name.clone(),
        label,
        field_type: field.field_type,
        role: ColumnRole::Field,
        group: group.to_string(),
        table: field.table.as_deref().unwrap_or(group).to_string(),
        codes: field.codes.clone(),
    }
}

/// Lays merged records out as a table.
///
/// Columns: the key, the schema fields in declared order, then the genomic
/// panel when one is given. Rows are ordered by patient key.
pub fn assemble_dataset(
    schema: &Schema,
    records: &[PatientRecord],
    key_name: &str,
    panel: Option<&GenomicPanel>,
    options: &PipelineOptions,
) -> Dataset {
    let span = info_span!("assemble", records = records.len(), fields = schema.len());
    let _guard = span.enter();

    let mut columns = Vec::with_capacity(1 + schema.len() + panel.map_or(0, GenomicPanel::width));
    columns.push(key_column(key_name));
    columns.extend(schema.fields().iter().map(|field| field_column(field, options)));
    if let Some(panel) = panel {
        columns.extend(panel.columns());
    }

    let mut ordered: Vec<&PatientRecord> = records.iter().collect();
    ordered.sort_by(|a, b| a.key.cmp(&b.key));

    let mut dataset = Dataset::new(columns);
    for record in ordered {
        let mut values = Vec::with_capacity(dataset.columns.len());
        values.push(Value::Text(record.key.as_str().to_string()));
        values.extend(schema.fields().iter().map(|field| record.value(&field.name).clone()));
        if let Some(panel) = panel {
            values.extend(panel.values(record.genomic.as_ref()));
        }
        dataset.push_row(DatasetRow {
            key: record.key.clone(),
            values,
        });
    }
    debug!(
        rows = dataset.len(),
        columns = dataset.columns.len(),
        "assembled dataset"
    );
    dataset
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use mirador_model::{PatientKey, Transform};

    fn record(raw: &str, age: Option<f64>) -> PatientRecord {
        let mut values = BTreeMap::new();
        values.insert("age".to_string(), age.map_or(Value::Absent, Value::Number));
        values.insert("PCR".to_string(), Value::Absent);
        PatientRecord {
            key: PatientKey::new(raw).expect("key"),
            values,
            provenance: BTreeMap::new(),
            genomic: None,
        }
    }

    fn schema() -> Schema {
        Schema::new(vec![
            CanonicalField::new("age", FieldType::Numeric).with_group("Demographics", "Age"),
            CanonicalField::new("PCR", FieldType::Numeric)
                .with_label("Viral load")
                .with_transform(Transform::LogViralLoad),
        ])
        .expect("schema")
    }

    #[test]
    fn key_column_then_declared_fields_sorted_rows() {
        let records = vec![record("PT09", None), record("PT07", Some(30.0))];
        let dataset = assemble_dataset(
            &schema(),
            &records,
            "GID",
            None,
            &PipelineOptions::new(),
        );
        assert_eq!(dataset.column_names(), vec!["GID", "age", "PCR"]);
        assert_eq!(dataset.columns[0].label, KEY_LABEL);
        assert_eq!(dataset.columns[0].role, ColumnRole::Key);
        let keys: Vec<&str> = dataset.rows.iter().map(|row| row.key.as_str()).collect();
        assert_eq!(keys, vec!["PT07", "PT09"]);
        assert_eq!(dataset.rows[0].values[0], Value::Text("PT07".into()));
        assert!(dataset.rows[1].values[1].is_absent());
    }

    #[test]
    fn display_metadata_defaults() {
        let dataset = assemble_dataset(&schema(), &[], "GID", None, &PipelineOptions::new());
        let age = &dataset.columns[1];
        assert_eq!((age.group.as_str(), age.table.as_str()), ("Demographics", "Age"));
        let pcr = &dataset.columns[2];
        assert_eq!(pcr.label, "Viral load");
        assert_eq!((pcr.group.as_str(), pcr.table.as_str()), (DEFAULT_GROUP, DEFAULT_GROUP));
    }

    #[test]
    fn active_transform_marks_the_label() {
        let options = PipelineOptions::new().with_log_transform(true);
        let dataset = assemble_dataset(&schema(), &[], "GID", None, &options);
        assert_eq!(dataset.columns[2].label, "Viral load (log units)");
    }

    #[test]
    fn genomic_columns_come_last() {
        let panel = GenomicPanel::new(vec![800], Vec::new());
        let dataset = assemble_dataset(
            &schema(),
            &[record("PT07", Some(30.0))],
            "GID",
            Some(&panel),
            &PipelineOptions::new().with_sequencing(true),
        );
        assert_eq!(dataset.columns.len(), 3 + panel.width());
        assert_eq!(dataset.columns[3].name, "SNP800");
        assert!(dataset.rows[0].values[3..].iter().all(Value::is_absent));
    }
}
