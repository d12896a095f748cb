//! Genomic enrichment of the Mirador dataset.
//!
//! - **aggregate**: sequencing samples to per-patient profiles
//! - **panel**: profile encoding into SNP, allele-frequency and cluster columns

pub mod aggregate;
pub mod panel;

pub use aggregate::{AggregationSettings, GenomicAggregate, SequencingData, build_profiles};
pub use panel::{GenomicPanel, af_column, snp_column};
