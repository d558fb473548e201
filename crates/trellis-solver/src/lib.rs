//! Incremental linear constraint solving for auto-layout.
//!
//! This crate implements:
//! - The Cassowary simplex tableau with incremental add and remove
//! - Required and prioritized (strong/medium/weak) constraints
//! - Edit and stay constraints with dual simplex re-solving
//!
//! # Example
//!
//! ```
//! use trellis_solver::{Constraint, Strength, Tableau};
//!
//! let mut tableau = Tableau::new();
//! let left = tableau.new_variable("left");
//! let width = tableau.new_variable("width");
//!
//! tableau.add_constraint(Constraint::equal(left, 10.0, Strength::REQUIRED))?;
//! tableau.add_constraint(Constraint::greater_or_equal(width, 40.0, Strength::REQUIRED))?;
//! tableau.add_constraint(Constraint::equal(width, 100.0, Strength::WEAK))?;
//!
//! tableau.add_edit_variable(width, Strength::STRONG)?;
//! tableau.suggest_value(width, 20.0)?;
//! tableau.resolve()?;
//!
//! assert!((tableau.value(left) - 10.0).abs() < 1e-6);
//! assert!((tableau.value(width) - 40.0).abs() < 1e-6);
//! # Ok::<(), trellis_solver::SolverError>(())
//! ```

mod constraint;
mod error;
mod expression;
mod options;
mod simplex;
mod strength;
mod tableau;
mod variable;

pub use constraint::{Constraint, ConstraintId, ConstraintKind, Inequality, Relation};
pub use error::SolverError;
pub use expression::{Expression, LinearExpression, TermChange};
pub use options::SolverOptions;
pub use strength::{Strength, StrengthLevel};
pub use tableau::Tableau;
pub use variable::{Variable, VariableArena};
