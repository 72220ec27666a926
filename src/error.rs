//! Typed failures for the analysis engine

use thiserror::Error;

/// Errors raised by analysis operations.
///
/// Every operation validates its preconditions before doing any work, so a
/// failed call leaves no partial output behind. Numeric edge cases (standard
/// deviation of a single sample, zero-variance correlation) are not errors;
/// they resolve to NaN in the result instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    /// The table has no rows to analyze.
    #[error("no data available for analysis")]
    EmptyData,

    /// A referenced column does not exist in the table schema.
    #[error("column '{0}' not found in data")]
    Schema(String),

    /// A parameter is outside its supported domain.
    #[error("{0}")]
    Parameter(String),
}
