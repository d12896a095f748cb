//! Tests for mirador-model types.

use mirador_model::{
    CodeLabel, Column, ColumnRole, Dataset, DatasetRow, Diagnostic, DiagnosticKind,
    DiagnosticReport, FieldType, LinkageError, PatientKey, SourceName, Value,
};

fn key(raw: &str) -> PatientKey {
    PatientKey::new(raw).expect("patient key")
}

fn column(name: &str, field_type: FieldType) -> Column {
    Column {
        name: name.to_string(),
        label: name.to_string(),
        field_type,
        role: ColumnRole::Field,
        group: "Demographics".to_string(),
        table: "Basic Information".to_string(),
        codes: Vec::new(),
    }
}

fn sample_dataset(second: Value) -> Dataset {
    let mut dataset = Dataset::new(vec![
        column("GID", FieldType::Text),
        column("age", FieldType::Numeric),
    ]);
    dataset.push_row(DatasetRow {
        key: key("PT01"),
        values: vec![Value::Text("PT01".to_string()), Value::Number(34.0)],
    });
    dataset.push_row(DatasetRow {
        key: key("PT02"),
        values: vec![Value::Text("PT02".to_string()), second],
    });
    dataset
}

#[test]
fn keys_reject_blank_values() {
    assert!(matches!(
        PatientKey::new("   "),
        Err(LinkageError::InvalidPatientKey(_))
    ));
    assert!(matches!(
        SourceName::new(""),
        Err(LinkageError::InvalidSourceName(_))
    ));
    assert_eq!(key(" PT07 ").as_str(), "PT07");
}

#[test]
fn report_counts_by_kind() {
    let source = SourceName::new("clinical").expect("source");
    let mut report = DiagnosticReport::new();
    report.record(
        Diagnostic::new(DiagnosticKind::UnparsableNumber, "not a number")
            .with_source(&source)
            .with_field("age")
            .with_raw_value("thirty"),
    );
    report.record(Diagnostic::new(
        DiagnosticKind::UnmatchedIdentifier,
        "bad identifier",
    ));
    report.record(Diagnostic::new(DiagnosticKind::UnparsableNumber, "again"));

    assert_eq!(report.len(), 3);
    assert_eq!(report.count(DiagnosticKind::UnparsableNumber), 2);
    assert_eq!(report.dropped_records(), 1);
    let counts = report.counts_by_kind();
    assert_eq!(counts.get(&DiagnosticKind::UnmatchedIdentifier), Some(&1));
    assert_eq!(report.diagnostics[0].raw_value.as_deref(), Some("thirty"));
}

#[test]
fn report_serializes_with_snake_case_kinds() {
    let mut report = DiagnosticReport::new();
    report.record(Diagnostic::new(DiagnosticKind::LowConfidenceCall, "depth 3"));
    let json = serde_json::to_string(&report).expect("serialize report");
    assert!(json.contains("\"low_confidence_call\""));
    let round: DiagnosticReport = serde_json::from_str(&json).expect("deserialize report");
    assert_eq!(round, report);
}

#[test]
fn dataset_lookup_by_key_and_column() {
    let dataset = sample_dataset(Value::Absent);
    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.value(&key("PT01"), "age"), Some(&Value::Number(34.0)));
    assert_eq!(dataset.value(&key("PT02"), "age"), Some(&Value::Absent));
    assert_eq!(dataset.value(&key("PT03"), "age"), None);
    assert_eq!(dataset.column_names(), vec!["GID", "age"]);
}

#[test]
fn fingerprint_is_stable_and_distinguishes_absent() {
    let absent = sample_dataset(Value::Absent);
    let again = sample_dataset(Value::Absent);
    let empty_text = sample_dataset(Value::Text(String::new()));
    let zero = sample_dataset(Value::Number(0.0));

    assert_eq!(absent.fingerprint(), again.fingerprint());
    assert_eq!(absent.fingerprint().len(), 64);
    assert_ne!(absent.fingerprint(), empty_text.fingerprint());
    assert_ne!(absent.fingerprint(), zero.fingerprint());
}

#[test]
fn column_code_labels() {
    let mut outcome = column("outcome", FieldType::Categorical);
    outcome.codes = vec![
        CodeLabel::new("survived", "Survived"),
        CodeLabel::new("died", "Died"),
    ];
    assert_eq!(outcome.code_label("died"), Some("Died"));
    assert_eq!(outcome.code_label("other"), None);
}
