//! Viral sequencing data: variant calls, cohort site variation and lineage
//! cluster assignments.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::PatientKey;

/// Read-level evidence behind one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadSupport {
    /// Read depth at the site (`DP`).
    pub depth: Option<u32>,
    /// Alternate allele frequency within the sample (`AF`).
    pub alt_frequency: Option<f64>,
}

/// A site of the variant-call source, independent of any sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSite {
    pub position: u64,
    pub reference: String,
    pub alternates: Vec<String>,
}

/// A non-reference genotype of one sample, keyed by the raw sample name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleCall {
    pub sample: String,
    pub position: u64,
    pub reference: String,
    pub alternates: Vec<String>,
    pub support: ReadSupport,
}

/// Parsed variant-call source: every sample column, every site, and the
/// non-reference calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantCallSet {
    pub samples: Vec<String>,
    pub sites: Vec<VariantSite>,
    pub calls: Vec<SampleCall>,
}

/// Per-site allele frequencies keyed by raw sample name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteFrequencies {
    pub position: u64,
    pub reference: String,
    pub alternates: Vec<String>,
    pub frequencies: BTreeMap<String, f64>,
}

/// One variant observed in one patient's viral sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantCall {
    pub key: PatientKey,
    pub position: u64,
    pub reference: String,
    pub alternates: Vec<String>,
    pub support: ReadSupport,
}

/// Cohort-level allele frequencies at one position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteVariation {
    pub position: u64,
    pub reference: String,
    pub alternates: Vec<String>,
    pub frequencies: BTreeMap<PatientKey, f64>,
}

/// Lineage clusters of the 2014 Sierra Leone sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterLabel {
    Cluster1,
    Cluster2,
    Cluster3,
    Unclassified,
}

impl ClusterLabel {
    pub const ALL: [ClusterLabel; 4] = [
        Self::Cluster1,
        Self::Cluster2,
        Self::Cluster3,
        Self::Unclassified,
    ];

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "1" => Some(Self::Cluster1),
            "2" => Some(Self::Cluster2),
            "3" => Some(Self::Cluster3),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Cluster1 => "1",
            Self::Cluster2 => "2",
            Self::Cluster3 => "3",
            Self::Unclassified => "unclassified",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Cluster1 => "Cluster 1",
            Self::Cluster2 => "Cluster 2",
            Self::Cluster3 => "Cluster 3",
            Self::Unclassified => "Unclassified",
        }
    }
}

impl fmt::Display for ClusterLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subcluster {
    A,
    B,
    C,
}

impl Subcluster {
    pub const ALL: [Subcluster; 3] = [Self::A, Self::B, Self::C];

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            '1' => Some(Self::A),
            '2' => Some(Self::B),
            '3' => Some(Self::C),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::A => "1",
            Self::B => "2",
            Self::C => "3",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::A => "Sub-cluster a",
            Self::B => "Sub-cluster b",
            Self::C => "Sub-cluster c",
        }
    }
}

/// Published classification of one patient's sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    pub label: ClusterLabel,
    pub mutations_from_cluster: Option<u32>,
    pub subcluster: Option<Subcluster>,
    pub mutations_from_subcluster: Option<u32>,
}

impl ClusterAssignment {
    pub fn unclassified() -> Self {
        Self {
            label: ClusterLabel::Unclassified,
            mutations_from_cluster: None,
            subcluster: None,
            mutations_from_subcluster: None,
        }
    }

    /// Parses a classification code `C[.MSN]`.
    ///
    /// `C` is the cluster, `M` the number of mutations from the cluster root,
    /// `S` the sub-cluster and `N` the mutations from the sub-cluster root
    /// (zero when a sub-cluster is given without it). Returns `None` when the
    /// cluster is not one of the published ones.
    pub fn from_classification(code: &str) -> Option<Self> {
        let trimmed = code.trim();
        let (cluster, extra) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        let label = ClusterLabel::from_code(cluster)?;
        let mut chars = extra.chars();
        let mutations_from_cluster = chars.next().and_then(|ch| ch.to_digit(10));
        let subcluster = chars.next().and_then(Subcluster::from_code);
        let mutations_from_subcluster = match subcluster {
            Some(_) => Some(chars.next().and_then(|ch| ch.to_digit(10)).unwrap_or(0)),
            None => None,
        };
        Some(Self {
            label,
            mutations_from_cluster,
            subcluster,
            mutations_from_subcluster,
        })
    }
}

/// Per-patient genomic summary, attached to a patient record when
/// sequencing integration is enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenomicProfile {
    pub key: PatientKey,
    /// Calls ordered by ascending position.
    pub calls: Vec<VariantCall>,
    /// `None` until a classification table has been consulted.
    #[serde(default)]
    pub cluster: Option<ClusterAssignment>,
    /// Alternate allele frequency per selected site.
    pub allele_frequencies: BTreeMap<u64, f64>,
    /// Sites whose only evidence was a call below the read-depth threshold.
    #[serde(default)]
    pub low_confidence_sites: BTreeSet<u64>,
}

impl GenomicProfile {
    pub fn new(key: PatientKey) -> Self {
        Self {
            key,
            calls: Vec::new(),
            cluster: None,
            allele_frequencies: BTreeMap::new(),
            low_confidence_sites: BTreeSet::new(),
        }
    }

    pub fn has_variant_at(&self, position: u64) -> bool {
        self.calls
            .binary_search_by_key(&position, |call| call.position)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_classification() {
        let assignment = ClusterAssignment::from_classification("3.112").expect("cluster");
        assert_eq!(assignment.label, ClusterLabel::Cluster3);
        assert_eq!(assignment.mutations_from_cluster, Some(1));
        assert_eq!(assignment.subcluster, Some(Subcluster::A));
        assert_eq!(assignment.mutations_from_subcluster, Some(2));
    }

    #[test]
    fn subcluster_without_count_defaults_to_zero() {
        let assignment = ClusterAssignment::from_classification("2.02").expect("cluster");
        assert_eq!(assignment.mutations_from_cluster, Some(0));
        assert_eq!(assignment.subcluster, Some(Subcluster::B));
        assert_eq!(assignment.mutations_from_subcluster, Some(0));
    }

    #[test]
    fn bare_cluster_code() {
        let assignment = ClusterAssignment::from_classification("1").expect("cluster");
        assert_eq!(assignment.label, ClusterLabel::Cluster1);
        assert_eq!(assignment.mutations_from_cluster, None);
        assert_eq!(assignment.subcluster, None);
    }

    #[test]
    fn unknown_cluster_is_rejected() {
        assert!(ClusterAssignment::from_classification("7.1").is_none());
        assert!(ClusterAssignment::from_classification("").is_none());
    }
}
