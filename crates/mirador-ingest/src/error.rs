//! Error types for Mirador ingestion.

use std::path::PathBuf;

use mirador_model::LinkageError;
use thiserror::Error;

/// File-level failures; each carries the offending path.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Parsing Errors ===
    #[error("failed to parse CSV {path}: {message}")]
    Csv { path: PathBuf, message: String },

    #[error("failed to parse study file {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("malformed VCF {path} at line {line}: {message}")]
    Vcf {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("required column '{column}' not found in {path}")]
    MissingColumn { column: String, path: PathBuf },

    // === Configuration Errors ===
    #[error("invalid study configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Linkage(#[from] LinkageError),
}

impl IngestError {
    pub(crate) fn from_csv(path: &std::path::Path, error: csv::Error) -> Self {
        let message = error.to_string();
        match error.into_kind() {
            csv::ErrorKind::Io(source) => Self::Io {
                path: path.to_path_buf(),
                source,
            },
            _ => Self::Csv {
                path: path.to_path_buf(),
                message,
            },
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IngestError::Vcf {
            path: PathBuf::from("seq/SNP-2014.vcf"),
            line: 12,
            message: "POS is not a number".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "malformed VCF seq/SNP-2014.vcf at line 12: POS is not a number"
        );
    }

    #[test]
    fn test_error_from_linkage() {
        let err: IngestError = LinkageError::InvalidConfig("no sources".to_string()).into();
        assert_eq!(err.to_string(), "invalid configuration: no sources");
    }
}
