//! Fixed-width encoding of genomic profiles into dataset columns.

use std::collections::BTreeSet;

use mirador_model::{
    ClusterLabel, CodeLabel, Column, ColumnRole, FieldType, GenomicProfile, Subcluster, Value,
};

use crate::aggregate::GenomicAggregate;

pub const SEQUENCING_GROUP: &str = "Sequencing";
pub const SNP_TABLE: &str = "Viral SNPs";
pub const AF_TABLE: &str = "Allele Frequencies";
pub const CLUSTER_TABLE: &str = "Clustering";

/// Column name of the variant flag at `position`.
pub fn snp_column(position: u64) -> String {
    format!("SNP{position}")
}

/// Column name of the allele frequency at `position`.
pub fn af_column(position: u64) -> String {
    format!("AF{position}")
}

/// The genomic columns of a run: one flag per variant site, one allele
/// frequency per selected site, then the four cluster columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenomicPanel {
    snp_sites: Vec<u64>,
    af_sites: Vec<u64>,
}

impl GenomicPanel {
    /// Repeated positions keep their first place only.
    pub fn new(snp_sites: Vec<u64>, af_sites: Vec<u64>) -> Self {
        Self {
            snp_sites: first_seen(snp_sites),
            af_sites: first_seen(af_sites),
        }
    }

    /// Panel covering every site of an aggregate.
    pub fn from_aggregate(aggregate: &GenomicAggregate) -> Self {
        Self::new(
            aggregate.sites.iter().map(|site| site.position).collect(),
            aggregate.variation.iter().map(|site| site.position).collect(),
        )
    }

    /// Number of columns the panel adds.
    pub fn width(&self) -> usize {
        self.snp_sites.len() + self.af_sites.len() + 4
    }

    pub fn columns(&self) -> Vec<Column> {
        let column = |name: String, label: String, field_type, table: &str, codes| Column {
            name,
            label,
            field_type,
            role: ColumnRole::Genomic,
            group: SEQUENCING_GROUP.to_string(),
            table: table.to_string(),
            codes,
        };
        let snp_codes = vec![CodeLabel::new("0", "Reference"), CodeLabel::new("1", "Variant")];

        let mut columns = Vec::with_capacity(self.width());
        for &position in &self.snp_sites {
            columns.push(column(
                snp_column(position),
                format!("SNP @{position}"),
                FieldType::Categorical,
                SNP_TABLE,
                snp_codes.clone(),
            ));
        }
        for &position in &self.af_sites {
            columns.push(column(
                af_column(position),
                format!("Allele Frequency @{position}"),
                FieldType::Numeric,
                AF_TABLE,
                Vec::new(),
            ));
        }
        columns.push(column(
            "CLUST".to_string(),
            "Cluster".to_string(),
            FieldType::Categorical,
            CLUSTER_TABLE,
            ClusterLabel::ALL
                .iter()
                .map(|label| CodeLabel::new(label.code(), label.label()))
                .collect(),
        ));
        columns.push(column(
            "MCLUST".to_string(),
            "# mutations from cluster".to_string(),
            FieldType::Numeric,
            CLUSTER_TABLE,
            Vec::new(),
        ));
        columns.push(column(
            "SCLUST".to_string(),
            "Sub-cluster".to_string(),
            FieldType::Categorical,
            CLUSTER_TABLE,
            Subcluster::ALL
                .iter()
                .map(|sub| CodeLabel::new(sub.code(), sub.label()))
                .collect(),
        ));
        columns.push(column(
            "MSCLUST".to_string(),
            "# mutations from sub-cluster".to_string(),
            FieldType::Numeric,
            CLUSTER_TABLE,
            Vec::new(),
        ));
        columns
    }

    /// Values of one patient in column order; all absent without a profile.
    ///
    /// A site known only from a low-confidence call stays absent rather than
    /// claiming the reference allele. The cluster columns stay absent when no
    /// classification was read.
    pub fn values(&self, profile: Option<&GenomicProfile>) -> Vec<Value> {
        let Some(profile) = profile else {
            return vec![Value::Absent; self.width()];
        };
        let mut values = Vec::with_capacity(self.width());
        for &position in &self.snp_sites {
            values.push(if profile.has_variant_at(position) {
                Value::Category("1".to_string())
            } else if profile.low_confidence_sites.contains(&position) {
                Value::Absent
            } else {
                Value::Category("0".to_string())
            });
        }
        for position in &self.af_sites {
            values.push(
                profile
                    .allele_frequencies
                    .get(position)
                    .map_or(Value::Absent, |frequency| Value::Number(*frequency)),
            );
        }
        let Some(cluster) = &profile.cluster else {
            values.resize(self.width(), Value::Absent);
            return values;
        };
        let count = |count: Option<u32>| count.map_or(Value::Absent, |n| Value::Number(f64::from(n)));
        values.push(Value::Category(cluster.label.code().to_string()));
        values.push(count(cluster.mutations_from_cluster));
        values.push(
            cluster
                .subcluster
                .map_or(Value::Absent, |sub| Value::Category(sub.code().to_string())),
        );
        values.push(count(cluster.mutations_from_subcluster));
        values
    }
}

fn first_seen(positions: Vec<u64>) -> Vec<u64> {
    let mut seen = BTreeSet::new();
    positions
        .into_iter()
        .filter(|position| seen.insert(*position))
        .collect()
}
