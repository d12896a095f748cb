//! Canonical schema: the ordered, typed set of output fields.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{LinkageError, SourceName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Numeric,
    Categorical,
    Date,
    Text,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
            Self::Date => "date",
            Self::Text => "text",
        }
    }
}

/// Unit transforms applied by the field mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// `ln(1 + x)` of a qPCR viral load (copies/mL).
    LogViralLoad,
}

impl Transform {
    /// Applies the transform; `None` when the input lies outside its domain.
    pub fn apply(self, value: f64) -> Option<f64> {
        match self {
            Self::LogViralLoad => (value > -1.0).then(|| value.ln_1p()),
        }
    }

    /// Suffix appended to column labels while the transform is active.
    pub fn unit_suffix(self) -> &'static str {
        match self {
            Self::LogViralLoad => " (log units)",
        }
    }
}

/// How many output columns a declared field occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repeat {
    #[default]
    Single,
    /// One column per measurement of a series source, optionally preceded by
    /// first/max/min/mean summary columns.
    Series { summary: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeLabel {
    pub code: String,
    pub label: String,
}

impl CodeLabel {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalField {
    pub name: String,
    pub field_type: FieldType,
    pub transform: Option<Transform>,
    /// Sources in decreasing authority for this field.
    pub priority: Vec<SourceName>,
    pub repeat: Repeat,
    pub label: Option<String>,
    pub group: Option<String>,
    pub table: Option<String>,
    /// Category codes in display order.
    pub codes: Vec<CodeLabel>,
}

impl CanonicalField {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            transform: None,
            priority: Vec::new(),
            repeat: Repeat::Single,
            label: None,
            group: None,
            table: None,
            codes: Vec::new(),
        }
    }

    /// A series field fed by exactly one series source.
    pub fn series(
        name: impl Into<String>,
        field_type: FieldType,
        source: SourceName,
        summary: bool,
    ) -> Self {
        let mut field = Self::new(name, field_type);
        field.priority = vec![source];
        field.repeat = Repeat::Series { summary };
        field
    }

    #[must_use]
    pub fn with_priority<I>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = SourceName>,
    {
        self.priority = sources.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>, table: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self.table = Some(table.into());
        self
    }

    #[must_use]
    pub fn with_codes(mut self, codes: Vec<CodeLabel>) -> Self {
        self.codes = codes;
        self
    }

    /// Display title: the label when set, otherwise the field name.
    pub fn title(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// Position of `source` in this field's priority list.
    pub fn priority_rank(&self, source: &SourceName) -> Option<usize> {
        self.priority.iter().position(|candidate| candidate == source)
    }

    pub fn series_source(&self) -> Option<&SourceName> {
        match self.repeat {
            Repeat::Series { .. } => self.priority.first(),
            Repeat::Single => None,
        }
    }

    pub fn has_summary(&self) -> bool {
        matches!(self.repeat, Repeat::Series { summary: true })
    }

    fn derived(&self, name: String, label: String, table: Option<String>) -> Self {
        Self {
            name,
            label: Some(label),
            table,
            repeat: Repeat::Single,
            ..self.clone()
        }
    }
}

/// Summary columns derived from a series field: suffix and label prefix.
pub const SERIES_SUMMARIES: [(&str, &str); 3] = [
    ("MAX", "Maximum measured"),
    ("MIN", "Minimum measured"),
    ("AVE", "Averaged"),
];

/// Column name of the `position`-th (1-based) measurement of a series field.
pub fn series_column(field: &str, position: usize) -> String {
    format!("{field}_{position}")
}

/// Column name of a summary statistic of a series field.
pub fn summary_column(field: &str, suffix: &str) -> String {
    format!("{field}_{suffix}")
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<CanonicalField>,
}

impl Schema {
    pub fn new(fields: Vec<CanonicalField>) -> Result<Self, LinkageError> {
        let mut seen = BTreeSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(LinkageError::DuplicateField(field.name.clone()));
            }
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[CanonicalField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&CanonicalField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Expands series fields into concrete columns.
    ///
    /// Consecutive series fields of the same source form one block: their
    /// summary columns come first, then the measurements interleaved by
    /// position (`DATE_1, LOAD_1, DATE_2, LOAD_2, ...`). `depths` holds the
    /// longest series seen per source; a missing entry expands to no
    /// measurement columns.
    pub fn expand_series(
        &self,
        depths: &BTreeMap<SourceName, usize>,
    ) -> Result<Self, LinkageError> {
        let declared = &self.fields;
        let mut fields = Vec::with_capacity(declared.len());
        let mut index = 0;
        while index < declared.len() {
            let field = &declared[index];
            let Some(source) = field.series_source() else {
                fields.push(field.clone());
                index += 1;
                continue;
            };
            let run_end = declared[index..]
                .iter()
                .position(|member| member.series_source() != Some(source))
                .map_or(declared.len(), |offset| index + offset);
            let run = &declared[index..run_end];

            for member in run.iter().filter(|member| member.has_summary()) {
                let summary_table = member.table.as_ref().map(|t| format!("{t} summary"));
                fields.push(member.derived(
                    member.name.clone(),
                    format!("First measured {}", member.title()),
                    summary_table.clone(),
                ));
                for (suffix, prefix) in SERIES_SUMMARIES {
                    fields.push(member.derived(
                        summary_column(&member.name, suffix),
                        format!("{prefix} {}", member.title()),
                        summary_table.clone(),
                    ));
                }
            }

            let depth = depths.get(source).copied().unwrap_or(0);
            for position in 1..=depth {
                for member in run {
                    fields.push(member.derived(
                        series_column(&member.name, position),
                        format!("{} {position}", member.title()),
                        member.table.as_ref().map(|t| format!("{t} {position}")),
                    ));
                }
            }
            index = run_end;
        }
        Self::new(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str) -> SourceName {
        SourceName::new(name).expect("source name")
    }

    #[test]
    fn rejects_duplicate_fields() {
        let result = Schema::new(vec![
            CanonicalField::new("age", FieldType::Numeric),
            CanonicalField::new("age", FieldType::Text),
        ]);
        assert!(matches!(result, Err(LinkageError::DuplicateField(name)) if name == "age"));
    }

    #[test]
    fn log_viral_load_domain() {
        let value = Transform::LogViralLoad.apply(99.0).expect("in domain");
        assert!((value - 4.605_170_185_988_091).abs() < 1e-9);
        assert_eq!(Transform::LogViralLoad.apply(0.0), Some(0.0));
        assert_eq!(Transform::LogViralLoad.apply(-1.0), None);
    }

    #[test]
    fn expands_series_block_interleaved() {
        let qpcr = source("qpcr");
        let schema = Schema::new(vec![
            CanonicalField::new("age", FieldType::Numeric),
            CanonicalField::series("DOPCR", FieldType::Date, qpcr.clone(), false),
            CanonicalField::series("PCR", FieldType::Numeric, qpcr.clone(), true)
                .with_label("Viral load"),
            CanonicalField::new("outcome", FieldType::Categorical),
        ])
        .expect("schema");
        let depths = BTreeMap::from([(qpcr, 2)]);
        let expanded = schema.expand_series(&depths).expect("expand");
        let names: Vec<&str> = expanded.names().collect();
        assert_eq!(
            names,
            vec![
                "age", "PCR", "PCR_MAX", "PCR_MIN", "PCR_AVE", "DOPCR_1", "PCR_1", "DOPCR_2",
                "PCR_2", "outcome"
            ]
        );
        let first = expanded.field("PCR").expect("PCR");
        assert_eq!(first.title(), "First measured Viral load");
        assert_eq!(first.repeat, Repeat::Single);
        assert_eq!(expanded.field("PCR_2").expect("PCR_2").title(), "Viral load 2");
    }

    #[test]
    fn series_without_rows_keeps_only_summaries() {
        let qpcr = source("qpcr");
        let schema = Schema::new(vec![CanonicalField::series(
            "PCR",
            FieldType::Numeric,
            qpcr,
            true,
        )])
        .expect("schema");
        let expanded = schema.expand_series(&BTreeMap::new()).expect("expand");
        assert_eq!(expanded.len(), 4);
    }
}
