//! Field mapping: linked source records to typed canonical values.

use std::collections::BTreeMap;

use mirador_model::schema::{SERIES_SUMMARIES, series_column, summary_column};
use mirador_model::{
    CanonicalField, Coercion, ColumnMapping, Diagnostic, DiagnosticKind, DiagnosticReport,
    LinkageError, MappingTable, PatientKey, PipelineOptions, RawValue, Schema, SourceKind,
    SourceName, SourceRecord, Transform, Value, format_number,
};
use tracing::{debug, info_span};

use crate::identifier::LinkedSource;
use crate::normalization::{OTHER_CATEGORY, parse_date, parse_f64, resolve_category};

static ABSENT: Value = Value::Absent;

/// Canonical values of one source, keyed by patient.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedSource {
    pub source: SourceName,
    pub kind: SourceKind,
    /// Every mapped field per patient, `Absent` included. Series sources
    /// carry expanded column names (`PCR_1`, `PCR_MAX`, ...).
    pub records: BTreeMap<PatientKey, BTreeMap<String, Value>>,
    /// Most measurements held by one patient (series sources only).
    pub series_depth: usize,
}

impl MappedSource {
    pub fn value(&self, key: &PatientKey, field: &str) -> &Value {
        self.records
            .get(key)
            .and_then(|values| values.get(field))
            .unwrap_or(&ABSENT)
    }

    pub fn contains(&self, key: &PatientKey) -> bool {
        self.records.contains_key(key)
    }
}

/// True when the pipeline options activate `transform`.
pub fn transform_enabled(transform: Transform, options: &PipelineOptions) -> bool {
    match transform {
        Transform::LogViralLoad => options.log_transform_viral_load,
    }
}

fn check_mappings(
    linked: &LinkedSource,
    table: &MappingTable,
    schema: &Schema,
) -> Result<(), LinkageError> {
    for mapping in &table.columns {
        let field = schema
            .field(&mapping.field)
            .ok_or_else(|| LinkageError::UnknownField {
                source_name: table.source.to_string(),
                field: mapping.field.clone(),
            })?;
        let feeds_series = field.series_source() == Some(&linked.source);
        match linked.kind {
            SourceKind::Series if !feeds_series => {
                return Err(LinkageError::InvalidConfig(format!(
                    "series source {} maps column {:?} to {}, which is not one of its series fields",
                    linked.source, mapping.column, field.name
                )));
            }
            SourceKind::Snapshot if field.series_source().is_some() => {
                return Err(LinkageError::InvalidConfig(format!(
                    "snapshot source {} maps column {:?} to series field {}",
                    linked.source, mapping.column, field.name
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

struct RowMapper<'a> {
    source: &'a SourceName,
    options: &'a PipelineOptions,
    diagnostics: &'a mut DiagnosticReport,
}

impl RowMapper<'_> {
    fn warn(
        &mut self,
        kind: DiagnosticKind,
        key: &PatientKey,
        field: &str,
        raw: &str,
        message: String,
    ) {
        self.diagnostics.record(
            Diagnostic::new(kind, message)
                .with_source(self.source)
                .with_patient(key)
                .with_field(field)
                .with_raw_value(raw),
        );
    }

    fn map_row(
        &mut self,
        key: &PatientKey,
        record: &SourceRecord,
        mappings: &[(&ColumnMapping, &CanonicalField)],
    ) -> BTreeMap<String, Value> {
        let mut values = BTreeMap::new();
        for (mapping, field) in mappings {
            let value = self.coerce(key, mapping, record.cell(&mapping.column));
            let value = self.transform(key, field, value);
            // A later mapping to the same field only fills gaps.
            let slot = values.entry(field.name.clone()).or_insert(Value::Absent);
            if slot.is_absent() {
                *slot = value;
            }
        }
        values
    }

    fn coerce(&mut self, key: &PatientKey, mapping: &ColumnMapping, raw: &RawValue) -> Value {
        let field = mapping.field.as_str();
        let text = match raw {
            RawValue::Absent => return Value::Absent,
            RawValue::Number(number) => {
                if let Coercion::Numeric = mapping.coercion {
                    return Value::Number(*number);
                }
                format_number(*number)
            }
            RawValue::Text(text) => text.clone(),
        };

        match &mapping.coercion {
            Coercion::Numeric => match parse_f64(&text) {
                Some(number) => Value::Number(number),
                None => {
                    self.warn(
                        DiagnosticKind::UnparsableNumber,
                        key,
                        field,
                        &text,
                        format!("column {:?} does not hold a number", mapping.column),
                    );
                    Value::Absent
                }
            },
            Coercion::Categorical { lookup } => match resolve_category(lookup, &text) {
                Some(code) => Value::Category(code),
                None => {
                    self.warn(
                        DiagnosticKind::UnknownCategory,
                        key,
                        field,
                        &text,
                        format!(
                            "column {:?} holds a category outside the lookup; recorded as {OTHER_CATEGORY}",
                            mapping.column
                        ),
                    );
                    Value::Category(OTHER_CATEGORY.to_string())
                }
            },
            Coercion::Date { format } => match parse_date(&text, format) {
                Some(date) => Value::Date(date),
                None => {
                    self.warn(
                        DiagnosticKind::UnparsableDate,
                        key,
                        field,
                        &text,
                        format!("column {:?} does not match date format {format:?}", mapping.column),
                    );
                    Value::Absent
                }
            },
            Coercion::Text => Value::Text(text),
        }
    }

    fn transform(&mut self, key: &PatientKey, field: &CanonicalField, value: Value) -> Value {
        let Some(transform) = field.transform else {
            return value;
        };
        if !transform_enabled(transform, self.options) {
            return value;
        }
        let Value::Number(number) = value else {
            return value;
        };
        match transform.apply(number) {
            Some(transformed) => Value::Number(transformed),
            None => {
                self.warn(
                    DiagnosticKind::InvalidTransformInput,
                    key,
                    &field.name,
                    &format_number(number),
                    format!("value outside the domain of {transform:?}"),
                );
                Value::Absent
            }
        }
    }
}

/// Collapses the rows of one patient into numbered measurement columns and,
/// where requested, first/max/min/mean summaries.
fn collapse_series(
    rows: &[BTreeMap<String, Value>],
    fields: &[&CanonicalField],
) -> BTreeMap<String, Value> {
    let mut collapsed = BTreeMap::new();
    for field in fields {
        let measurements: Vec<&Value> = rows
            .iter()
            .map(|row| row.get(&field.name).unwrap_or(&ABSENT))
            .collect();
        for (index, value) in measurements.iter().enumerate() {
            collapsed.insert(series_column(&field.name, index + 1), (*value).clone());
        }
        if !field.has_summary() {
            continue;
        }

        let numbers: Vec<f64> = measurements.iter().filter_map(|v| v.as_number()).collect();
        let number_or_absent = |number: Option<f64>| number.map_or(Value::Absent, Value::Number);
        let first = numbers.first().copied();
        let max = numbers.iter().copied().reduce(f64::max);
        let min = numbers.iter().copied().reduce(f64::min);
        let mean = (!numbers.is_empty()).then(|| numbers.iter().sum::<f64>() / numbers.len() as f64);

        collapsed.insert(field.name.clone(), number_or_absent(first));
        for ((suffix, _), statistic) in SERIES_SUMMARIES.iter().zip([max, min, mean]) {
            collapsed.insert(
                summary_column(&field.name, suffix),
                number_or_absent(statistic),
            );
        }
    }
    collapsed
}

/// Maps the records of a linked source onto canonical fields.
///
/// `schema` is the declared schema (series fields unexpanded). Mapping to an
/// unknown field is fatal; per-cell problems become warnings and leave the
/// value absent (or `other` for categories).
pub fn map_source(
    linked: &LinkedSource,
    table: &MappingTable,
    schema: &Schema,
    options: &PipelineOptions,
    diagnostics: &mut DiagnosticReport,
) -> Result<MappedSource, LinkageError> {
    let span = info_span!("map", source = %linked.source);
    let _guard = span.enter();

    check_mappings(linked, table, schema)?;

    let mut mappings = Vec::with_capacity(table.columns.len());
    for mapping in &table.columns {
        if !linked.has_column(&mapping.column) {
            diagnostics.record(
                Diagnostic::new(
                    DiagnosticKind::MissingColumn,
                    format!("mapped column {:?} is not in the header", mapping.column),
                )
                .with_source(&linked.source)
                .with_field(mapping.field.clone()),
            );
        }
        if let Some(field) = schema.field(&mapping.field) {
            mappings.push((mapping, field));
        }
    }

    let mut mapped_fields: Vec<&CanonicalField> = Vec::new();
    for (_, field) in &mappings {
        if !mapped_fields.iter().any(|known| known.name == field.name) {
            mapped_fields.push(*field);
        }
    }

    let mut row_mapper = RowMapper {
        source: &linked.source,
        options,
        diagnostics,
    };
    let mut records = BTreeMap::new();
    for (key, rows) in &linked.records {
        let values = match linked.kind {
            SourceKind::Snapshot => match rows.first() {
                Some(record) => row_mapper.map_row(key, record, &mappings),
                None => continue,
            },
            SourceKind::Series => {
                let mapped: Vec<_> = rows
                    .iter()
                    .map(|record| row_mapper.map_row(key, record, &mappings))
                    .collect();
                collapse_series(&mapped, &mapped_fields)
            }
        };
        records.insert(key.clone(), values);
    }

    let series_depth = match linked.kind {
        SourceKind::Series => linked.series_depth(),
        SourceKind::Snapshot => 0,
    };
    debug!(patients = records.len(), series_depth, "mapped source");
    Ok(MappedSource {
        source: linked.source.clone(),
        kind: linked.kind,
        records,
        series_depth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirador_model::FieldType;

    fn key(raw: &str) -> PatientKey {
        PatientKey::new(raw).expect("key")
    }

    fn row(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn series_summaries_skip_absent_measurements() {
        let source = SourceName::new("qpcr").expect("source");
        let field = CanonicalField::series("PCR", FieldType::Numeric, source, true);
        let rows = vec![
            row(&[("PCR", Value::Absent)]),
            row(&[("PCR", Value::Number(4.0))]),
            row(&[("PCR", Value::Number(2.0))]),
        ];
        let collapsed = collapse_series(&rows, &[&field]);
        assert_eq!(collapsed["PCR_1"], Value::Absent);
        assert_eq!(collapsed["PCR_2"], Value::Number(4.0));
        assert_eq!(collapsed["PCR"], Value::Number(4.0));
        assert_eq!(collapsed["PCR_MAX"], Value::Number(4.0));
        assert_eq!(collapsed["PCR_MIN"], Value::Number(2.0));
        assert_eq!(collapsed["PCR_AVE"], Value::Number(3.0));
    }

    #[test]
    fn series_without_numbers_has_absent_summaries() {
        let source = SourceName::new("qpcr").expect("source");
        let field = CanonicalField::series("PCR", FieldType::Numeric, source, true);
        let collapsed = collapse_series(&[row(&[])], &[&field]);
        assert_eq!(collapsed.len(), 5);
        assert!(collapsed.values().all(Value::is_absent));
        assert_eq!(
            MappedSource {
                source: SourceName::new("qpcr").expect("source"),
                kind: SourceKind::Series,
                records: BTreeMap::from([(key("PT01"), collapsed)]),
                series_depth: 1,
            }
            .value(&key("PT01"), "PCR_9"),
            &Value::Absent
        );
    }

    #[test]
    fn transform_gate_follows_options() {
        let options = PipelineOptions::new();
        assert!(!transform_enabled(Transform::LogViralLoad, &options));
        assert!(transform_enabled(
            Transform::LogViralLoad,
            &options.with_log_transform(true)
        ));
    }
}
