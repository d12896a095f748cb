//! Shared data model of the Mirador cohort pipeline.
//!
//! - **ids**: patient keys and source names
//! - **value**: raw source cells and typed canonical values
//! - **schema**: canonical fields, priorities, transforms and series expansion
//! - **mapping**: declarative column mappings and coercion rules
//! - **record**: source records and merged patient records
//! - **genomic**: variant calls, site variation and cluster assignments
//! - **diagnostics**: recoverable warnings collected during a run
//! - **dataset**: the assembled output table

pub mod dataset;
pub mod diagnostics;
pub mod error;
pub mod genomic;
pub mod ids;
pub mod mapping;
pub mod options;
pub mod record;
pub mod schema;
pub mod value;

pub use dataset::{Column, ColumnRole, Dataset, DatasetRow};
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticReport};
pub use error::{LinkageError, Result};
pub use genomic::{
    ClusterAssignment, ClusterLabel, GenomicProfile, ReadSupport, SampleCall, SiteFrequencies,
    SiteVariation, Subcluster, VariantCall, VariantCallSet, VariantSite,
};
pub use ids::{PatientKey, SourceName};
pub use mapping::{Coercion, ColumnMapping, DEFAULT_DATE_FORMAT, MappingTable};
pub use options::{DEFAULT_MIN_DIGITS, IdentifierRules, PipelineOptions};
pub use record::{PatientRecord, SourceKind, SourceRecord, SourceRecordSet};
pub use schema::{CanonicalField, CodeLabel, FieldType, Repeat, Schema, Transform};
pub use value::{RawValue, Value, format_number};
