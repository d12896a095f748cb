//! Tests for linkage and field mapping.

use chrono::NaiveDate;
use mirador_model::{
    CanonicalField, Coercion, DiagnosticKind, DiagnosticReport, FieldType, IdentifierRules,
    LinkageError, MappingTable, PatientKey, PipelineOptions, RawValue, Schema, SourceKind,
    SourceName, SourceRecord, SourceRecordSet, Transform, Value,
};
use mirador_transform::{IdentifierNormalizer, LinkedSource, link_source, map_source};
use proptest::prelude::*;

fn source(name: &str) -> SourceName {
    SourceName::new(name).expect("source name")
}

fn key(raw: &str) -> PatientKey {
    PatientKey::new(raw).expect("patient key")
}

fn record_set(name: &str, kind: SourceKind, header: &[&str], rows: &[&[&str]]) -> SourceRecordSet {
    let source = source(name);
    let records = rows
        .iter()
        .map(|row| SourceRecord {
            source: source.clone(),
            raw_id: row[0].to_string(),
            cells: header
                .iter()
                .zip(row.iter())
                .map(|(column, cell)| (column.to_string(), RawValue::from_cell(cell)))
                .collect(),
        })
        .collect();
    SourceRecordSet {
        source,
        kind,
        columns: header.iter().map(|column| column.to_string()).collect(),
        records,
    }
}

fn link(set: SourceRecordSet, diagnostics: &mut DiagnosticReport) -> LinkedSource {
    link_source(set, &IdentifierNormalizer::default(), diagnostics).expect("link")
}

fn clinical_schema() -> Schema {
    Schema::new(vec![
        CanonicalField::new("age", FieldType::Numeric),
        CanonicalField::new("outcome", FieldType::Categorical),
        CanonicalField::new("admitted", FieldType::Date),
        CanonicalField::new("viral_load", FieldType::Numeric)
            .with_transform(Transform::LogViralLoad),
        CanonicalField::series("DOPCR", FieldType::Date, source("qpcr"), false),
        CanonicalField::series("PCR", FieldType::Numeric, source("qpcr"), true)
            .with_transform(Transform::LogViralLoad),
    ])
    .expect("schema")
}

fn clinical_table() -> MappingTable {
    MappingTable::new(source("clinical"))
        .with_column("Age", "age", Coercion::Numeric)
        .with_column(
            "Outcome",
            "outcome",
            Coercion::categorical([("Died", "0"), ("Survived", "1")]),
        )
        .with_column("Admission", "admitted", Coercion::date("%d/%m/%Y"))
        .with_column("Load", "viral_load", Coercion::Numeric)
}

// =============================================================================
// Linkage
// =============================================================================

#[test]
fn unmatched_identifiers_are_dropped_with_warning() {
    let mut diagnostics = DiagnosticReport::new();
    let set = record_set(
        "clinical",
        SourceKind::Snapshot,
        &["ID", "Age"],
        &[&["PT-07", "34"], &["???", "50"], &["", "12"]],
    );
    let linked = link(set, &mut diagnostics);

    assert_eq!(linked.keys().collect::<Vec<_>>(), vec![&key("PT07")]);
    assert_eq!(diagnostics.count(DiagnosticKind::UnmatchedIdentifier), 2);
    let raw: Vec<_> = diagnostics
        .iter()
        .filter_map(|diagnostic| diagnostic.raw_value.as_deref())
        .collect();
    assert_eq!(raw, vec!["???", ""]);
}

#[test]
fn snapshot_collision_is_fatal() {
    let set = record_set(
        "clinical",
        SourceKind::Snapshot,
        &["ID", "Age"],
        &[&["PT-07", "34"], &["pt7", "35"]],
    );
    let result = link_source(
        set,
        &IdentifierNormalizer::default(),
        &mut DiagnosticReport::new(),
    );
    match result {
        Err(LinkageError::KeyCollision {
            key, first, second, ..
        }) => {
            assert_eq!(key, "PT07");
            assert_eq!(first, "PT-07");
            assert_eq!(second, "pt7");
        }
        other => panic!("expected collision, got {other:?}"),
    }
}

#[test]
fn series_sources_keep_every_row() {
    let mut diagnostics = DiagnosticReport::new();
    let set = record_set(
        "qpcr",
        SourceKind::Series,
        &["ID", "Date", "Load"],
        &[
            &["PT01", "2014-06-01", "100"],
            &["pt-1", "2014-06-03", "10"],
            &["PT02", "2014-06-02", "5"],
        ],
    );
    let linked = link(set, &mut diagnostics);
    assert_eq!(linked.len(), 2);
    assert_eq!(linked.series_depth(), 2);
    assert!(diagnostics.is_empty());
}

#[test]
fn ignored_identifiers_vanish_silently() {
    let normalizer = IdentifierNormalizer::new(IdentifierRules::default().with_ignored("PT-99"));
    let set = record_set(
        "clinical",
        SourceKind::Snapshot,
        &["ID"],
        &[&["PT01"], &["PT99"]],
    );
    let mut diagnostics = DiagnosticReport::new();
    let linked = link_source(set, &normalizer, &mut diagnostics).expect("link");
    assert_eq!(linked.len(), 1);
    assert!(diagnostics.is_empty());
}

// =============================================================================
// Mapping
// =============================================================================

#[test]
fn coerces_cells_and_warns_on_bad_values() {
    let mut diagnostics = DiagnosticReport::new();
    let set = record_set(
        "clinical",
        SourceKind::Snapshot,
        &["ID", "Age", "Outcome", "Admission", "Load"],
        &[
            &["PT01", "34", "Died", "03/06/2014", "99"],
            &["PT02", "thirty", "transferred", "2014-06-03", ""],
        ],
    );
    let linked = link(set, &mut diagnostics);
    let mapped = map_source(
        &linked,
        &clinical_table(),
        &clinical_schema(),
        &PipelineOptions::new(),
        &mut diagnostics,
    )
    .expect("map");

    let first = key("PT01");
    assert_eq!(mapped.value(&first, "age"), &Value::Number(34.0));
    assert_eq!(mapped.value(&first, "outcome"), &Value::Category("0".into()));
    assert_eq!(
        mapped.value(&first, "admitted"),
        &Value::Date(NaiveDate::from_ymd_opt(2014, 6, 3).expect("date"))
    );
    assert_eq!(mapped.value(&first, "viral_load"), &Value::Number(99.0));

    let second = key("PT02");
    assert_eq!(mapped.value(&second, "age"), &Value::Absent);
    assert_eq!(
        mapped.value(&second, "outcome"),
        &Value::Category("other".into())
    );
    assert_eq!(mapped.value(&second, "admitted"), &Value::Absent);
    assert_eq!(mapped.value(&second, "viral_load"), &Value::Absent);

    assert_eq!(diagnostics.count(DiagnosticKind::UnparsableNumber), 1);
    assert_eq!(diagnostics.count(DiagnosticKind::UnknownCategory), 1);
    assert_eq!(diagnostics.count(DiagnosticKind::UnparsableDate), 1);
    let bad_age = diagnostics
        .iter()
        .find(|diagnostic| diagnostic.kind == DiagnosticKind::UnparsableNumber)
        .expect("age warning");
    assert_eq!(bad_age.patient.as_ref(), Some(&second));
    assert_eq!(bad_age.raw_value.as_deref(), Some("thirty"));
}

#[test]
fn log_transform_replaces_raw_value() {
    let mut diagnostics = DiagnosticReport::new();
    let set = record_set(
        "clinical",
        SourceKind::Snapshot,
        &["ID", "Load"],
        &[&["PT01", "99"], &["PT02", "-4"]],
    );
    let linked = link(set, &mut diagnostics);
    let mapped = map_source(
        &linked,
        &clinical_table(),
        &clinical_schema(),
        &PipelineOptions::new().with_log_transform(true),
        &mut diagnostics,
    )
    .expect("map");

    let Some(transformed) = mapped.value(&key("PT01"), "viral_load").as_number() else {
        panic!("expected a number");
    };
    assert!((transformed - 4.605).abs() < 1e-3);
    assert_eq!(mapped.value(&key("PT02"), "viral_load"), &Value::Absent);
    assert_eq!(diagnostics.count(DiagnosticKind::InvalidTransformInput), 1);
}

#[test]
fn missing_mapped_column_warns_and_leaves_field_absent() {
    let mut diagnostics = DiagnosticReport::new();
    let set = record_set("clinical", SourceKind::Snapshot, &["ID", "Age"], &[&["PT01", "34"]]);
    let linked = link(set, &mut diagnostics);
    let mapped = map_source(
        &linked,
        &clinical_table(),
        &clinical_schema(),
        &PipelineOptions::new(),
        &mut diagnostics,
    )
    .expect("map");

    assert_eq!(diagnostics.count(DiagnosticKind::MissingColumn), 3);
    assert_eq!(mapped.value(&key("PT01"), "outcome"), &Value::Absent);
    assert_eq!(mapped.value(&key("PT01"), "age"), &Value::Number(34.0));
}

#[test]
fn mapping_to_unknown_field_is_fatal() {
    let mut diagnostics = DiagnosticReport::new();
    let set = record_set("clinical", SourceKind::Snapshot, &["ID", "Age"], &[&["PT01", "34"]]);
    let linked = link(set, &mut diagnostics);
    let table =
        MappingTable::new(source("clinical")).with_column("Age", "age_years", Coercion::Numeric);
    let result = map_source(
        &linked,
        &table,
        &clinical_schema(),
        &PipelineOptions::new(),
        &mut diagnostics,
    );
    assert!(matches!(
        result,
        Err(LinkageError::UnknownField { field, .. }) if field == "age_years"
    ));
}

#[test]
fn series_rows_collapse_into_numbered_columns() {
    let mut diagnostics = DiagnosticReport::new();
    let set = record_set(
        "qpcr",
        SourceKind::Series,
        &["ID", "Date", "Load"],
        &[
            &["PT01", "2014-06-01", "100"],
            &["PT01", "2014-06-03", "10"],
            &["PT02", "2014-06-02", "5"],
        ],
    );
    let linked = link(set, &mut diagnostics);
    let table = MappingTable::new(source("qpcr"))
        .with_column("Date", "DOPCR", Coercion::date("%Y-%m-%d"))
        .with_column("Load", "PCR", Coercion::Numeric);
    let mapped = map_source(
        &linked,
        &table,
        &clinical_schema(),
        &PipelineOptions::new(),
        &mut diagnostics,
    )
    .expect("map");

    assert_eq!(mapped.series_depth, 2);
    let first = key("PT01");
    assert_eq!(mapped.value(&first, "PCR_1"), &Value::Number(100.0));
    assert_eq!(mapped.value(&first, "PCR_2"), &Value::Number(10.0));
    assert_eq!(mapped.value(&first, "PCR"), &Value::Number(100.0));
    assert_eq!(mapped.value(&first, "PCR_MIN"), &Value::Number(10.0));
    assert_eq!(mapped.value(&first, "PCR_AVE"), &Value::Number(55.0));
    assert_eq!(mapped.value(&key("PT02"), "PCR_2"), &Value::Absent);
    assert_eq!(
        mapped.value(&first, "DOPCR_2"),
        &Value::Date(NaiveDate::from_ymd_opt(2014, 6, 3).expect("date"))
    );
}

// =============================================================================
// Normalizer properties
// =============================================================================

proptest! {
    #[test]
    fn normalization_is_idempotent(
        prefix in "[A-Za-z]{1,4}",
        separator in prop::sample::select(vec!["", "-", "_", " ", "."]),
        number in 0u32..100_000,
        zeros in 0usize..3,
    ) {
        let normalizer = IdentifierNormalizer::default();
        let raw = format!("{prefix}{separator}{}{number}", "0".repeat(zeros));
        let key = normalizer.normalize(&raw).expect("well-formed identifier");
        let again = normalizer.normalize(key.as_str()).expect("canonical key");
        prop_assert_eq!(&key, &again);
        prop_assert!(key.as_str().starts_with(&prefix.to_ascii_uppercase()));
    }

    #[test]
    fn spellings_of_one_number_converge(number in 0u32..10_000, zeros in 0usize..4) {
        let normalizer = IdentifierNormalizer::default();
        let plain = normalizer.normalize(&format!("PT{number}")).expect("plain");
        let padded = normalizer
            .normalize(&format!("pt-{}{number}", "0".repeat(zeros)))
            .expect("padded");
        prop_assert_eq!(plain, padded);
    }
}
