//! Record merger: mapped sources to one record per cohort patient.

use std::collections::{BTreeMap, BTreeSet};

use mirador_model::{
    CanonicalField, Diagnostic, DiagnosticKind, DiagnosticReport, GenomicProfile, PatientKey,
    PatientRecord, Schema, SourceName, Value,
};
use mirador_transform::MappedSource;
use tracing::{debug, info, info_span};

/// One mapped source as seen by the merger.
#[derive(Debug, Clone, Copy)]
pub struct MergeSource<'a> {
    pub mapped: &'a MappedSource,
    /// Whether the source's patients define the cohort.
    pub cohort: bool,
}

impl<'a> MergeSource<'a> {
    pub fn cohort(mapped: &'a MappedSource) -> Self {
        Self {
            mapped,
            cohort: true,
        }
    }

    pub fn enrichment(mapped: &'a MappedSource) -> Self {
        Self {
            mapped,
            cohort: false,
        }
    }
}

/// Union of the patients of every cohort-defining source.
pub fn cohort_keys(sources: &[MergeSource<'_>]) -> BTreeSet<PatientKey> {
    sources
        .iter()
        .filter(|source| source.cohort)
        .flat_map(|source| source.mapped.records.keys().cloned())
        .collect()
}

/// Rank of `source` for `field`; lower wins.
///
/// Listed sources rank by their position in the field's priority list, the
/// rest after them in configuration order.
fn rank(field: &CanonicalField, source: &SourceName, config_index: usize) -> usize {
    field
        .priority_rank(source)
        .unwrap_or(field.priority.len() + config_index)
}

/// Merges mapped sources into one record per cohort patient.
///
/// `schema` is the expanded schema; `sources` are in configuration order.
/// Every record carries every schema field, `Absent` when no source supplied
/// a value. Profiles of patients outside the cohort are ignored here; the
/// aggregator already reported them.
pub fn merge_records(
    schema: &Schema,
    sources: &[MergeSource<'_>],
    mut profiles: BTreeMap<PatientKey, GenomicProfile>,
    diagnostics: &mut DiagnosticReport,
) -> Vec<PatientRecord> {
    let cohort = cohort_keys(sources);
    let span = info_span!("merge", patients = cohort.len(), sources = sources.len());
    let _guard = span.enter();

    for source in sources.iter().filter(|source| !source.cohort) {
        for key in source.mapped.records.keys() {
            if !cohort.contains(key) {
                diagnostics.record(
                    Diagnostic::new(
                        DiagnosticKind::OutsideCohort,
                        "patient is not part of the cohort; record dropped",
                    )
                    .with_source(&source.mapped.source)
                    .with_patient(key),
                );
            }
        }
    }

    let mut records = Vec::with_capacity(cohort.len());
    for key in cohort {
        let mut values = BTreeMap::new();
        let mut provenance = BTreeMap::new();
        for field in schema.fields() {
            let mut winner: Option<(usize, &SourceName, &Value)> = None;
            for (config_index, source) in sources.iter().enumerate() {
                let value = source.mapped.value(&key, &field.name);
                if value.is_absent() {
                    continue;
                }
                let candidate_rank = rank(field, &source.mapped.source, config_index);
                match winner {
                    Some((best, winning_source, winning_value)) => {
                        if winning_value != value {
                            debug!(
                                patient = %key,
                                field = %field.name,
                                kept = %winning_source,
                                other = %source.mapped.source,
                                "conflicting values"
                            );
                        }
                        if candidate_rank < best {
                            winner = Some((candidate_rank, &source.mapped.source, value));
                        }
                    }
                    None => winner = Some((candidate_rank, &source.mapped.source, value)),
                }
            }
            match winner {
                Some((_, source, value)) => {
                    values.insert(field.name.clone(), value.clone());
                    provenance.insert(field.name.clone(), source.clone());
                }
                None => {
                    values.insert(field.name.clone(), Value::Absent);
                }
            }
        }
        let genomic = profiles.remove(&key);
        records.push(PatientRecord {
            key,
            values,
            provenance,
            genomic,
        });
    }

    info!(
        records = records.len(),
        with_profile = records.iter().filter(|r| r.genomic.is_some()).count(),
        "merged patient records"
    );
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirador_model::{FieldType, SourceKind};

    fn key(raw: &str) -> PatientKey {
        PatientKey::new(raw).expect("key")
    }

    fn name(raw: &str) -> SourceName {
        SourceName::new(raw).expect("source")
    }

    fn mapped(source: &str, rows: &[(&str, &str, Value)]) -> MappedSource {
        let mut records: BTreeMap<PatientKey, BTreeMap<String, Value>> = BTreeMap::new();
        for (patient, field, value) in rows {
            records
                .entry(key(patient))
                .or_default()
                .insert(field.to_string(), value.clone());
        }
        MappedSource {
            source: name(source),
            kind: SourceKind::Snapshot,
            records,
            series_depth: 0,
        }
    }

    #[test]
    fn priority_list_decides_conflicts() {
        let schema = Schema::new(vec![
            CanonicalField::new("age", FieldType::Numeric)
                .with_priority([name("lab"), name("clinical")]),
        ])
        .expect("schema");
        let clinical = mapped("clinical", &[("PT07", "age", Value::Number(30.0))]);
        let lab = mapped("lab", &[("PT07", "age", Value::Number(31.0))]);
        let records = merge_records(
            &schema,
            &[MergeSource::cohort(&clinical), MergeSource::cohort(&lab)],
            BTreeMap::new(),
            &mut DiagnosticReport::new(),
        );
        assert_eq!(records[0].value("age"), &Value::Number(31.0));
        assert_eq!(records[0].source_of("age"), Some(&name("lab")));
    }

    #[test]
    fn unlisted_sources_follow_configuration_order() {
        let schema = Schema::new(vec![
            CanonicalField::new("sex", FieldType::Categorical).with_priority([name("registry")]),
        ])
        .expect("schema");
        let clinical = mapped("clinical", &[("PT07", "sex", Value::Category("1".into()))]);
        let lab = mapped("lab", &[("PT07", "sex", Value::Category("2".into()))]);
        let registry = mapped("registry", &[("PT07", "sex", Value::Absent)]);
        let records = merge_records(
            &schema,
            &[
                MergeSource::cohort(&clinical),
                MergeSource::cohort(&lab),
                MergeSource::cohort(&registry),
            ],
            BTreeMap::new(),
            &mut DiagnosticReport::new(),
        );
        assert_eq!(records[0].value("sex"), &Value::Category("1".into()));
        assert_eq!(records[0].source_of("sex"), Some(&name("clinical")));
    }

    #[test]
    fn enrichment_sources_do_not_add_patients() {
        let schema = Schema::new(vec![CanonicalField::new("age", FieldType::Numeric)])
            .expect("schema");
        let clinical = mapped("clinical", &[("PT07", "age", Value::Number(30.0))]);
        let demographics = mapped(
            "demographics",
            &[
                ("PT07", "age", Value::Number(29.0)),
                ("PT99", "age", Value::Number(50.0)),
            ],
        );
        let mut diagnostics = DiagnosticReport::new();
        let records = merge_records(
            &schema,
            &[
                MergeSource::cohort(&clinical),
                MergeSource::enrichment(&demographics),
            ],
            BTreeMap::new(),
            &mut diagnostics,
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, key("PT07"));
        assert_eq!(diagnostics.count(DiagnosticKind::OutsideCohort), 1);
    }

    #[test]
    fn every_field_is_present() {
        let schema = Schema::new(vec![
            CanonicalField::new("age", FieldType::Numeric),
            CanonicalField::new("outcome", FieldType::Categorical),
        ])
        .expect("schema");
        let clinical = mapped("clinical", &[("PT07", "age", Value::Number(30.0))]);
        let records = merge_records(
            &schema,
            &[MergeSource::cohort(&clinical)],
            BTreeMap::from([(key("PT07"), GenomicProfile::new(key("PT07")))]),
            &mut DiagnosticReport::new(),
        );
        assert_eq!(records[0].values.len(), 2);
        assert!(records[0].value("outcome").is_absent());
        assert_eq!(records[0].source_of("outcome"), None);
        assert!(records[0].genomic.is_some());
    }
}
