//! Recoverable issues collected during a run.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::PatientKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Identifier matched no recognized pattern; the record was dropped.
    UnmatchedIdentifier,
    /// Patient not part of the clinical cohort; the data was dropped.
    OutsideCohort,
    /// A mapped column is missing from the source header.
    MissingColumn,
    UnparsableNumber,
    UnparsableDate,
    /// Category outside the lookup table; replaced with `other`.
    UnknownCategory,
    /// Value outside the domain of the field's transform.
    InvalidTransformInput,
    /// Variant call below the minimum read depth.
    LowConfidenceCall,
    /// Sequencing sample name that does not normalize to a patient key.
    UnmatchedSequencingSample,
    /// Sequenced patient missing from the cluster classification.
    UnclassifiedCluster,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnmatchedIdentifier => "unmatched_identifier",
            Self::OutsideCohort => "outside_cohort",
            Self::MissingColumn => "missing_column",
            Self::UnparsableNumber => "unparsable_number",
            Self::UnparsableDate => "unparsable_date",
            Self::UnknownCategory => "unknown_category",
            Self::InvalidTransformInput => "invalid_transform_input",
            Self::LowConfidenceCall => "low_confidence_call",
            Self::UnmatchedSequencingSample => "unmatched_sequencing_sample",
            Self::UnclassifiedCluster => "unclassified_cluster",
        }
    }

    /// True when the issue removed a whole record rather than one value.
    pub fn drops_record(self) -> bool {
        matches!(
            self,
            Self::UnmatchedIdentifier | Self::OutsideCohort | Self::UnmatchedSequencingSample
        )
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub source: Option<String>,
    pub patient: Option<PatientKey>,
    pub field: Option<String>,
    pub raw_value: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            source: None,
            patient: None,
            field: None,
            raw_value: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl fmt::Display) -> Self {
        self.source = Some(source.to_string());
        self
    }

    #[must_use]
    pub fn with_patient(mut self, patient: &PatientKey) -> Self {
        self.patient = Some(patient.clone());
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    #[must_use]
    pub fn with_raw_value(mut self, raw: impl Into<String>) -> Self {
        self.raw_value = Some(raw.into());
        self
    }
}

/// All warnings of a run, in the order they were raised.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning and emits it as a `tracing` event.
    ///
    /// Raw values stay out of the event; they only reach the report.
    pub fn record(&mut self, diagnostic: Diagnostic) {
        warn!(
            kind = %diagnostic.kind,
            source = diagnostic.source.as_deref().unwrap_or("-"),
            patient = diagnostic.patient.as_ref().map_or("-", PatientKey::as_str),
            field = diagnostic.field.as_deref().unwrap_or("-"),
            "{}",
            diagnostic.message
        );
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, other: DiagnosticReport) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.kind == kind)
            .count()
    }

    pub fn counts_by_kind(&self) -> BTreeMap<DiagnosticKind, usize> {
        let mut counts = BTreeMap::new();
        for diagnostic in &self.diagnostics {
            *counts.entry(diagnostic.kind).or_insert(0) += 1;
        }
        counts
    }

    pub fn dropped_records(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.kind.drops_record())
            .count()
    }
}
