//! Ingestion for the Mirador pipeline.
//!
//! - **config**: the TOML study file (sources, mappings, schema, sequencing)
//! - **csv_table**: delimited file reading
//! - **loader**: tabular rows to source records
//! - **vcf**: variant-call and site-variation VCF files
//! - **clusters**: lineage cluster classification table

pub mod clusters;
pub mod config;
pub mod csv_table;
pub mod error;
pub mod loader;
pub mod vcf;

pub use clusters::{ClusterRow, read_cluster_table};
pub use config::{
    DEFAULT_KEY_COLUMN, DEFAULT_MISSING, DatasetSettings, SequencingSettings, Study,
    load_study_config, parse_study_config,
};
pub use csv_table::{CsvTable, parse_delimited, read_csv_table, read_delimited};
pub use error::{IngestError, Result};
pub use loader::{SourceSpec, TabularSource, load_source};
pub use vcf::{
    parse_site_frequencies, parse_variant_calls, read_site_frequencies, read_variant_calls,
};
