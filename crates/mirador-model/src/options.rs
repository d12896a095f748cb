//! Options that select optional pipeline behavior.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Attach genomic profiles and emit the genomic columns.
    #[serde(default)]
    pub include_sequencing: bool,

    /// Replace qPCR viral loads with `ln(1 + value)`.
    ///
    /// The transformed value replaces the raw one; the column is never
    /// emitted in both units.
    #[serde(default)]
    pub log_transform_viral_load: bool,
}

impl PipelineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_sequencing(mut self, enable: bool) -> Self {
        self.include_sequencing = enable;
        self
    }

    #[must_use]
    pub fn with_log_transform(mut self, enable: bool) -> Self {
        self.log_transform_viral_load = enable;
        self
    }
}

/// Default zero-padding of the numeric part of a patient key.
pub const DEFAULT_MIN_DIGITS: usize = 2;

/// Rules of the identifier normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierRules {
    /// Minimum width of the numeric part, left-padded with zeros.
    pub min_digits: usize,
    /// Alternate prefixes (uppercase) and the canonical prefix they stand for.
    pub prefix_aliases: BTreeMap<String, String>,
    /// Identifiers removed from every source, compared after normalization.
    pub ignore: Vec<String>,
}

impl Default for IdentifierRules {
    fn default() -> Self {
        Self {
            min_digits: DEFAULT_MIN_DIGITS,
            prefix_aliases: BTreeMap::new(),
            ignore: Vec::new(),
        }
    }
}

impl IdentifierRules {
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.prefix_aliases.insert(
            alias.into().to_ascii_uppercase(),
            canonical.into().to_ascii_uppercase(),
        );
        self
    }

    #[must_use]
    pub fn with_min_digits(mut self, min_digits: usize) -> Self {
        self.min_digits = min_digits;
        self
    }

    #[must_use]
    pub fn with_ignored(mut self, raw: impl Into<String>) -> Self {
        self.ignore.push(raw.into());
        self
    }
}
