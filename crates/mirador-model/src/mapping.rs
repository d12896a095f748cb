use std::collections::BTreeMap;

use crate::{FieldType, SourceName};

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Rule turning a raw cell into a canonical value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coercion {
    Numeric,
    /// Remap through `lookup` (raw → code); an empty lookup passes values
    /// through unchanged.
    Categorical { lookup: BTreeMap<String, String> },
    /// Parse with a fixed `chrono` format string.
    Date { format: String },
    Text,
}

impl Coercion {
    /// Default coercion for a field type.
    pub fn for_field_type(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Numeric => Self::Numeric,
            FieldType::Categorical => Self::Categorical {
                lookup: BTreeMap::new(),
            },
            FieldType::Date => Self::date(DEFAULT_DATE_FORMAT),
            FieldType::Text => Self::Text,
        }
    }

    pub fn date(format: impl Into<String>) -> Self {
        Self::Date {
            format: format.into(),
        }
    }

    pub fn categorical<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Categorical {
            lookup: entries
                .into_iter()
                .map(|(raw, code)| (raw.into(), code.into()))
                .collect(),
        }
    }

    /// Field type the coercion produces.
    pub fn output_type(&self) -> FieldType {
        match self {
            Self::Numeric => FieldType::Numeric,
            Self::Categorical { .. } => FieldType::Categorical,
            Self::Date { .. } => FieldType::Date,
            Self::Text => FieldType::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    /// Raw column name, verbatim.
    pub column: String,
    /// Canonical field name (the declared name for series fields).
    pub field: String,
    pub coercion: Coercion,
}

/// Declarative column mapping of one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTable {
    pub source: SourceName,
    pub columns: Vec<ColumnMapping>,
}

impl MappingTable {
    pub fn new(source: SourceName) -> Self {
        Self {
            source,
            columns: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_column(
        mut self,
        column: impl Into<String>,
        field: impl Into<String>,
        coercion: Coercion,
    ) -> Self {
        self.columns.push(ColumnMapping {
            column: column.into(),
            field: field.into(),
            coercion,
        });
        self
    }
}
