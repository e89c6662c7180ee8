//! Validation error types.

use std::fmt;

use thiserror::Error;

/// The constraint a [`ParameterSet`](crate::ParameterSet) field violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// Value must be strictly greater than zero.
    Positive,
    /// Value must lie within `[0, 100]`.
    Percentage,
    /// Value must be a finite number.
    Finite,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Positive => f.write_str("must be > 0"),
            Constraint::Percentage => f.write_str("must be between 0 and 100"),
            Constraint::Finite => f.write_str("must be a finite number"),
        }
    }
}

/// A parameter set failed validation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field} {constraint} (got {value})")]
pub struct ValidationError {
    pub field: &'static str,
    pub constraint: Constraint,
    pub value: f64,
}

pub type Result<T> = std::result::Result<T, ValidationError>;
