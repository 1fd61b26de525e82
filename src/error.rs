use std::path::{Path, PathBuf};

use thiserror::Error;

/// Fatal conditions of a sort run.
///
/// Public operations return [anyhow::Error]; a [SortError] carried inside can be recovered
/// with `error.downcast_ref::<SortError>()`.
#[derive(Debug, Error)]
pub enum SortError {
    /// A positional selector is not smaller than the header width
    #[error("column index {index} is out of range, the header has {width} columns")]
    ColumnOutOfRange { index: usize, width: usize },
    /// A selector names a column but the input has no header
    #[error("column '{name}' is selected by name but the input has no header")]
    MissingHeader { name: String },
    /// A selector names a column the header does not contain
    #[error("column '{name}' is not present in the header")]
    ColumnNotFound { name: String },
    /// A key field could not be parsed as a number. `row` is the 1-based position of the
    /// record among the data records of its input, the header excluded.
    #[error(
        "column {column} value '{value}' is not a number, row: {}, record: {record}",
        .row.map_or_else(|| "unknown".to_string(), |row| row.to_string())
    )]
    InvalidNumericField {
        column: usize,
        value: String,
        record: String,
        row: Option<u64>,
    },
    /// Reading or writing the source, the destination or a temporary file failed
    #[error("I/O failure, path: {}, error: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl SortError {
    pub(crate) fn io<E: Into<csv::Error>>(path: &Path, error: E) -> SortError {
        SortError::Io {
            path: path.to_path_buf(),
            source: error.into(),
        }
    }

    /// Set the row of an [SortError::InvalidNumericField], other errors are returned as is.
    pub(crate) fn at_row(self, row: u64) -> SortError {
        match self {
            SortError::InvalidNumericField { column, value, record, .. } => SortError::InvalidNumericField {
                column,
                value,
                record,
                row: Some(row),
            },
            other => other,
        }
    }
}

/// Attach the offending path to an I/O or csv failure.
pub(crate) trait AtPath<T> {
    fn at_path(self, path: &Path) -> Result<T, SortError>;
}

impl<T, E: Into<csv::Error>> AtPath<T> for Result<T, E> {
    fn at_path(self, path: &Path) -> Result<T, SortError> {
        self.map_err(|e| SortError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::PathBuf;

    use crate::error::{AtPath, SortError};

    #[test]
    fn test_io_error_keeps_path() {
        let result: Result<(), io::Error> = Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let error = result.at_path(&PathBuf::from("/tmp/missing.csv")).unwrap_err();
        match &error {
            SortError::Io { path, .. } => assert_eq!(path, &PathBuf::from("/tmp/missing.csv")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(error.to_string().contains("/tmp/missing.csv"));
    }

    #[test]
    fn test_row_is_reported() {
        let error = SortError::InvalidNumericField {
            column: 2,
            value: "n/a".to_string(),
            record: "x,y,n/a".to_string(),
            row: None,
        };
        assert!(error.to_string().contains("row: unknown"));
        let error = error.at_row(7);
        assert!(matches!(error, SortError::InvalidNumericField { row: Some(7), .. }));
        assert!(error.to_string().contains("row: 7"));

        let missing = SortError::MissingHeader { name: "age".to_string() }.at_row(7);
        assert!(matches!(missing, SortError::MissingHeader { .. }));
    }
}
