//! Lineage cluster classification table.

use std::path::Path;

use crate::csv_table::read_delimited;
use crate::error::{IngestError, Result};

/// Raw classification of one sequenced sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRow {
    pub sample: String,
    /// `C[.MSN]` classification code.
    pub code: String,
}

/// Reads the tab-separated cluster table, locating columns by header name.
///
/// Rows with a blank sample are skipped; blank codes are kept so the
/// aggregator can report them as unclassified.
pub fn read_cluster_table(
    path: &Path,
    sample_column: &str,
    code_column: &str,
) -> Result<Vec<ClusterRow>> {
    let table = read_delimited(path, b'\t')?;
    let missing = |column: &str| IngestError::MissingColumn {
        column: column.to_string(),
        path: path.to_path_buf(),
    };
    let sample_index = table
        .column_index(sample_column)
        .ok_or_else(|| missing(sample_column))?;
    let code_index = table
        .column_index(code_column)
        .ok_or_else(|| missing(code_column))?;

    Ok(table
        .rows
        .iter()
        .filter(|row| !row[sample_index].is_empty())
        .map(|row| ClusterRow {
            sample: row[sample_index].clone(),
            code: row[code_index].clone(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_named_columns() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            "sample\tcountry\tclassification\nG3686\tSLE\t3.112\n\tSLE\t1\nG3687\tSLE\t\n"
        )
        .expect("write");
        let rows = read_cluster_table(file.path(), "sample", "classification").expect("read");
        assert_eq!(
            rows,
            vec![
                ClusterRow {
                    sample: "G3686".to_string(),
                    code: "3.112".to_string()
                },
                ClusterRow {
                    sample: "G3687".to_string(),
                    code: String::new()
                },
            ]
        );
    }

    #[test]
    fn missing_column_names_the_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "id\tcode").expect("write");
        let error = read_cluster_table(file.path(), "sample", "code").expect_err("missing");
        assert!(matches!(error, IngestError::MissingColumn { column, .. } if column == "sample"));
    }
}
