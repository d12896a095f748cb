use thiserror::Error;

/// Fatal conditions that abort a run before any dataset is produced.
#[derive(Debug, Error)]
pub enum LinkageError {
    #[error("invalid patient key: {0:?}")]
    InvalidPatientKey(String),

    #[error("invalid source name: {0:?}")]
    InvalidSourceName(String),

    #[error("source {source_name}: missing identifier column {column:?}")]
    MissingIdColumn { source_name: String, column: String },

    #[error("source {source_name}: malformed source: {message}")]
    MalformedSource {
        source_name: String,
        message: String,
    },

    #[error("source {source_name}: duplicate identifier {raw_id:?}")]
    DuplicateIdentifier { source_name: String, raw_id: String },

    #[error("source {source_name}: identifiers {first:?} and {second:?} both normalize to {key}")]
    KeyCollision {
        source_name: String,
        key: String,
        first: String,
        second: String,
    },

    #[error("duplicate field in schema: {0}")]
    DuplicateField(String),

    #[error("mapping for source {source_name} targets unknown field {field}")]
    UnknownField { source_name: String, field: String },

    #[error("field {field} lists unknown source {source_name}")]
    UnknownSource { field: String, source_name: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, LinkageError>;
