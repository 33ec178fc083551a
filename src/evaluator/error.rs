//! Error types for expression evaluation

use thiserror::Error;

use crate::ast::ArgumentError;

/// Result type for evaluation operations.
pub type EvaluationResult<T> = Result<T, EvaluationError>;

/// Errors that can occur while evaluating an expression tree.
///
/// Argument errors and shape mismatches always abort the enclosing call.
/// `SeriesNotFound` is a sentinel: functions with a documented fallback catch
/// it and substitute defaults; everything else propagates it up.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    /// A required argument is missing or has the wrong type
    #[error(transparent)]
    Argument(#[from] ArgumentError),

    /// Expression names a function the registry does not know
    #[error("unknown function: {name:?}")]
    UnknownFunction {
        /// Name as written in the query
        name: String,
    },

    /// A referenced metric pattern has no entry in the data bag
    #[error("series {metric:?} does not exist in the fetched data")]
    SeriesNotFound {
        /// Pattern that missed
        metric: String,
    },

    /// Two paired series have incompatible step or length
    #[error("series {left:?} must have the same step and length as {right:?}")]
    ShapeMismatch {
        /// First series name
        left: String,
        /// Second series name
        right: String,
    },

    /// Expression node cannot be evaluated in this position
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of the misuse
        message: String,
    },
}

impl EvaluationError {
    /// True for the soft "no data fetched for this pattern" condition.
    pub fn is_series_not_found(&self) -> bool {
        matches!(self, EvaluationError::SeriesNotFound { .. })
    }
}
