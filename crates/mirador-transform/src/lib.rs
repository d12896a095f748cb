//! Linkage and mapping stages of the Mirador pipeline.
//!
//! - **identifier**: patient identifier normalization and per-source linkage
//! - **mapper**: column mappings, coercions, transforms and series collapse
//! - **normalization**: numeric, categorical and date cell parsing

pub mod identifier;
pub mod mapper;
pub mod normalization;

pub use identifier::{
    IdentifierError, IdentifierNormalizer, LinkedSource, link_source, sample_identifier,
};
pub use mapper::{MappedSource, map_source, transform_enabled};
