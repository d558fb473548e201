//! Errors during layout.

use thiserror::Error;
use trellis_solver::SolverError;

use crate::engine::{LayoutConstraintId, ViewId};

/// Errors raised by the layout engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("View {0} does not exist")]
    UnknownView(ViewId),

    #[error("Layout constraint {0} does not exist")]
    UnknownConstraint(LayoutConstraintId),

    #[error("View {0} is already being dragged")]
    AlreadyDragging(ViewId),

    #[error("View {0} is not being dragged")]
    NotDragging(ViewId),

    #[error("Constraint error: {0}")]
    Solver(#[from] SolverError),
}
