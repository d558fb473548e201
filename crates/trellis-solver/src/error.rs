//! Error types for the constraint solver.

use thiserror::Error;

use crate::constraint::ConstraintId;
use crate::variable::Variable;

/// Errors that can occur while mutating or solving a tableau.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("Required constraint conflicts with the required constraints already added")]
    RequiredConflict,

    #[error("Constraint {0} is not in the tableau")]
    UnknownConstraint(ConstraintId),

    #[error("Variable {0} does not belong to this tableau")]
    UnknownVariable(Variable),

    #[error("Variable {0} already has an edit constraint")]
    DuplicateEditVariable(Variable),

    #[error("Variable {0} has no edit constraint")]
    UnknownEditVariable(Variable),

    #[error("Edit and stay constraints cannot be required")]
    RequiredEditStrength,

    #[error("The objective function is unbounded")]
    Unbounded,

    #[error("Pivot limit of {limit} exceeded")]
    IterationLimit { limit: usize },

    #[error("Tableau invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Internal solver error: {0}")]
    Internal(&'static str),
}
