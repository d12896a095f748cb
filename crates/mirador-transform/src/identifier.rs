//! Patient identifier normalization and per-source linkage.
//!
//! Every source spells patient identifiers its own way (`PT-07`, `pt7`,
//! `PT 007`, `G3686.1`). The normalizer maps each spelling onto one
//! [`PatientKey`]; the linker applies it to a whole source and groups the
//! records by key.

use std::collections::{BTreeMap, BTreeSet};

use mirador_model::{
    Diagnostic, DiagnosticKind, DiagnosticReport, IdentifierRules, LinkageError, PatientKey,
    SourceKind, SourceName, SourceRecord, SourceRecordSet,
};
use thiserror::Error;
use tracing::{debug, info_span, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("identifier {raw:?} does not match an alphabetic prefix followed by digits")]
    Unrecognized { raw: String },
}

fn is_separator(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, '-' | '_' | '.')
}

/// `""` or a replicate suffix such as `.1`.
fn is_replicate_suffix(suffix: &str) -> bool {
    suffix.is_empty()
        || suffix
            .strip_prefix('.')
            .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|ch| ch.is_ascii_digit()))
}

/// Sequencing sample names carry the patient identifier as their last
/// underscore-separated token (`EBOV_2014_G3686.1`).
pub fn sample_identifier(sample: &str) -> &str {
    sample.rsplit('_').next().unwrap_or(sample)
}

#[derive(Debug, Clone, Default)]
pub struct IdentifierNormalizer {
    rules: IdentifierRules,
    ignored: BTreeSet<PatientKey>,
}

impl IdentifierNormalizer {
    pub fn new(rules: IdentifierRules) -> Self {
        let mut normalizer = Self {
            rules,
            ignored: BTreeSet::new(),
        };
        let mut ignored = BTreeSet::new();
        for raw in &normalizer.rules.ignore {
            match normalizer.normalize(raw) {
                Ok(key) => {
                    ignored.insert(key);
                }
                Err(error) => warn!(%error, "ignore list entry never matches"),
            }
        }
        normalizer.ignored = ignored;
        normalizer
    }

    pub fn rules(&self) -> &IdentifierRules {
        &self.rules
    }

    /// Maps a raw identifier onto its canonical key.
    ///
    /// Case is folded to upper, separators between prefix and number are
    /// dropped, a trailing replicate suffix (`.1`) is removed, prefix aliases
    /// are applied and the number is re-padded to `min_digits`.
    pub fn normalize(&self, raw: &str) -> Result<PatientKey, IdentifierError> {
        let unrecognized = || IdentifierError::Unrecognized {
            raw: raw.to_string(),
        };
        let upper = raw.trim().to_ascii_uppercase();

        let prefix_end = upper
            .find(|ch: char| !ch.is_ascii_alphabetic())
            .unwrap_or(upper.len());
        let (prefix, rest) = upper.split_at(prefix_end);
        if prefix.is_empty() {
            return Err(unrecognized());
        }

        let rest = rest.trim_start_matches(is_separator);
        let digits_end = rest
            .find(|ch: char| !ch.is_ascii_digit())
            .unwrap_or(rest.len());
        let (digits, suffix) = rest.split_at(digits_end);
        if digits.is_empty() || !is_replicate_suffix(suffix) {
            return Err(unrecognized());
        }

        let number = digits.trim_start_matches('0');
        let number = if number.is_empty() { "0" } else { number };
        let prefix = self
            .rules
            .prefix_aliases
            .get(prefix)
            .map_or(prefix, String::as_str);
        let width = self.rules.min_digits;
        PatientKey::new(format!("{prefix}{number:0>width$}")).map_err(|_| unrecognized())
    }

    /// True when `key` is on the ignore list.
    pub fn is_ignored(&self, key: &PatientKey) -> bool {
        self.ignored.contains(key)
    }
}

/// A source whose records carry canonical keys.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedSource {
    pub source: SourceName,
    pub kind: SourceKind,
    /// Column names in file order.
    pub columns: Vec<String>,
    /// Records per key in file order; snapshot sources hold exactly one.
    pub records: BTreeMap<PatientKey, Vec<SourceRecord>>,
}

impl LinkedSource {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|candidate| candidate == column)
    }

    pub fn keys(&self) -> impl Iterator<Item = &PatientKey> {
        self.records.keys()
    }

    /// Most rows held by one patient.
    pub fn series_depth(&self) -> usize {
        self.records.values().map(Vec::len).max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Normalizes every identifier of a source and groups its records by key.
///
/// Unrecognized identifiers drop their record with an
/// `UnmatchedIdentifier` warning. In a snapshot source two records reaching
/// the same key abort the run.
pub fn link_source(
    set: SourceRecordSet,
    normalizer: &IdentifierNormalizer,
    diagnostics: &mut DiagnosticReport,
) -> Result<LinkedSource, LinkageError> {
    let span = info_span!("link", source = %set.source, kind = ?set.kind);
    let _guard = span.enter();

    let mut records: BTreeMap<PatientKey, Vec<SourceRecord>> = BTreeMap::new();
    let mut ignored = 0usize;
    for record in set.records {
        let key = match normalizer.normalize(&record.raw_id) {
            Ok(key) => key,
            Err(error) => {
                diagnostics.record(
                    Diagnostic::new(DiagnosticKind::UnmatchedIdentifier, error.to_string())
                        .with_source(&set.source)
                        .with_raw_value(record.raw_id.clone()),
                );
                continue;
            }
        };
        if normalizer.is_ignored(&key) {
            ignored += 1;
            continue;
        }

        let entry = records.entry(key.clone()).or_default();
        if set.kind == SourceKind::Snapshot
            && let Some(existing) = entry.first()
        {
            let source_name = set.source.to_string();
            return Err(if existing.raw_id == record.raw_id {
                LinkageError::DuplicateIdentifier {
                    source_name,
                    raw_id: record.raw_id,
                }
            } else {
                LinkageError::KeyCollision {
                    source_name,
                    key: key.to_string(),
                    first: existing.raw_id.clone(),
                    second: record.raw_id,
                }
            });
        }
        entry.push(record);
    }

    debug!(patients = records.len(), ignored, "linked source");
    Ok(LinkedSource {
        source: set.source,
        kind: set.kind,
        columns: set.columns,
        records,
    })
}
