use thiserror::Error;

use crate::data::dataset::ColumnType;
use crate::processing::operation::{ColumnRequirement, StatOperation};

/// Why a statistic could not be computed. None of these invalidate the dataset.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StatError {
    #[error("column '{column}' has no usable values")]
    EmptyColumn { column: String },

    #[error("not enough data: need at least {needed} values, found {found}")]
    InsufficientData { needed: usize, found: usize },

    #[error("column '{column}' has {found} distinct categories, need at least 2")]
    InsufficientCategories { column: String, found: usize },

    #[error("factor yields {found} non-empty groups, need at least 2")]
    InsufficientGroups { found: usize },

    #[error("column '{column}' is {found}, {operation} needs a {expected} column")]
    TypeMismatch {
        column: String,
        operation: StatOperation,
        expected: ColumnRequirement,
        found: ColumnType,
    },

    #[error("no column named '{0}'")]
    UnknownColumn(String),

    #[error("{operation} takes {expected} column(s), got {found}")]
    Arity {
        operation: StatOperation,
        expected: usize,
        found: usize,
    },

    #[error("computation failed: {0}")]
    Computation(String),
}

/// Reject non-finite results such as overflowed sums.
pub(crate) fn finite(value: f64, what: &str) -> Result<f64, StatError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(StatError::Computation(format!("{what} is not finite ({value})")))
    }
}
