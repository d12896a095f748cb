//! Record merging, dataset assembly and the pipeline driver.
//!
//! - **merge**: per-field conflict resolution across mapped sources
//! - **assemble**: merged records to the typed output table
//! - **pipeline**: the staged run over in-memory inputs or a study file

pub mod assemble;
pub mod merge;
pub mod pipeline;

pub use assemble::{DEFAULT_GROUP, KEY_GROUP, KEY_LABEL, KEY_TABLE, assemble_dataset};
pub use merge::{MergeSource, cohort_keys, merge_records};
pub use pipeline::{
    PipelineInput, PipelineOutput, RunStats, SequencingInput, SourceInput, SourceStats,
    run_pipeline, run_study,
};
