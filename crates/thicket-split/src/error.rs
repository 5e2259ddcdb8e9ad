/// Errors from building split configurations and feature matrices.
///
/// The search itself never fails; these are raised only while validating
/// inputs or registering columns.
#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    /// Returned when the minimum leaf size is zero.
    #[error("min_leaf_size must be at least 1, got {min_leaf_size}")]
    InvalidLeafSize {
        /// The invalid leaf size provided.
        min_leaf_size: usize,
    },

    /// Returned when the number of randomized candidates per column is zero.
    #[error("random_candidates must be at least 1, got {random_candidates}")]
    InvalidRandomCandidates {
        /// The invalid candidate count provided.
        random_candidates: usize,
    },

    /// Returned when a column is registered under a name already in use.
    #[error("feature \"{name}\" already exists at position {position}")]
    DuplicateFeatureName {
        /// The duplicated column name.
        name: String,
        /// Position of the column already registered under that name.
        position: usize,
    },

    /// Returned when a column's length differs from the matrix case count.
    #[error("feature \"{name}\" has {got} cases, expected {expected}")]
    LengthMismatch {
        /// Name of the offending column.
        name: String,
        /// Case count shared by the matrix.
        expected: usize,
        /// Case count of the offending column.
        got: usize,
    },

    /// Returned when a column name is not present in the matrix.
    #[error("unknown feature \"{name}\"")]
    UnknownFeature {
        /// The name that was looked up.
        name: String,
    },

    /// Returned when a categorical column was required.
    #[error("feature \"{name}\" is not categorical")]
    NotCategorical {
        /// Name of the offending column.
        name: String,
    },

    /// Returned when a numeric column was required.
    #[error("feature \"{name}\" is not numeric")]
    NotNumeric {
        /// Name of the offending column.
        name: String,
    },

    /// Returned when an operation needs at least one column.
    #[error("feature matrix has no columns")]
    EmptyMatrix,
}
