//! I/O error types for thicket-io.

use std::path::PathBuf;

use thicket_split::SplitError;

/// Errors from opening and parsing annotated feature matrix files.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the TSV parser encounters a malformed record.
    #[error("TSV parse error at row {row_index}")]
    CsvParse {
        /// Zero-based row index, counting the header as row 0.
        row_index: usize,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a feature row has a different number of fields than
    /// the header.
    #[error("inconsistent row length: row {row_index} ({feature}) has {got} fields, expected {expected}")]
    InconsistentRowLength {
        /// Zero-based row index, counting the header as row 0.
        row_index: usize,
        /// First field of the offending row.
        feature: String,
        /// Field count of the header.
        expected: usize,
        /// Field count of the offending row.
        got: usize,
    },

    /// Returned when a parsed column cannot be registered in the matrix.
    #[error("row {row_index} rejected by feature matrix")]
    Matrix {
        /// Zero-based row index, counting the header as row 0.
        row_index: usize,
        /// Underlying matrix error.
        source: SplitError,
    },
}
