//! Constraints submitted to the tableau.
//!
//! Every relational form is normalized into `lhs - rhs  relation  0`.

use std::fmt;

use crate::expression::Expression;
use crate::strength::Strength;
use crate::variable::Variable;

/// Identifier of a constraint inside a tableau.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(pub(crate) usize);

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The relation between two sides of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Relation {
    LessOrEqual,
    Equal,
    GreaterOrEqual,
}

/// The relation of a normalized inequality against zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Inequality {
    /// `expression <= 0`
    LessOrEqual,
    /// `expression >= 0`
    GreaterOrEqual,
}

/// What a constraint asks of the solver.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintKind {
    /// `expression == 0`
    LinearEquality(Expression),
    /// `expression <= 0` or `expression >= 0`
    LinearInequality(Expression, Inequality),
    /// Hold a variable at a value the caller keeps suggesting
    Edit(Variable),
    /// Keep a variable where it currently is
    Stay(Variable),
}

/// A constraint with its strength.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    kind: ConstraintKind,
    strength: Strength,
}

impl Constraint {
    /// Create a constraint `lhs relation rhs`.
    pub fn new(
        lhs: impl Into<Expression>,
        relation: Relation,
        rhs: impl Into<Expression>,
        strength: Strength,
    ) -> Self {
        let mut expression = lhs.into();
        expression.add_expression(&rhs.into(), -1.0);

        let kind = match relation {
            Relation::Equal => ConstraintKind::LinearEquality(expression),
            Relation::LessOrEqual => {
                ConstraintKind::LinearInequality(expression, Inequality::LessOrEqual)
            }
            Relation::GreaterOrEqual => {
                ConstraintKind::LinearInequality(expression, Inequality::GreaterOrEqual)
            }
        };
        Self { kind, strength }
    }

    /// `lhs == rhs`
    pub fn equal(lhs: impl Into<Expression>, rhs: impl Into<Expression>, strength: Strength) -> Self {
        Self::new(lhs, Relation::Equal, rhs, strength)
    }

    /// `lhs <= rhs`
    pub fn less_or_equal(
        lhs: impl Into<Expression>,
        rhs: impl Into<Expression>,
        strength: Strength,
    ) -> Self {
        Self::new(lhs, Relation::LessOrEqual, rhs, strength)
    }

    /// `lhs >= rhs`
    pub fn greater_or_equal(
        lhs: impl Into<Expression>,
        rhs: impl Into<Expression>,
        strength: Strength,
    ) -> Self {
        Self::new(lhs, Relation::GreaterOrEqual, rhs, strength)
    }

    /// An edit constraint on `variable`, pinned at its current value.
    pub fn edit(variable: Variable, strength: Strength) -> Self {
        Self {
            kind: ConstraintKind::Edit(variable),
            strength,
        }
    }

    /// A stay constraint on `variable`, pinned at its current value.
    pub fn stay(variable: Variable, strength: Strength) -> Self {
        Self {
            kind: ConstraintKind::Stay(variable),
            strength,
        }
    }

    pub fn kind(&self) -> &ConstraintKind {
        &self.kind
    }

    pub fn strength(&self) -> Strength {
        self.strength
    }

    pub fn is_required(&self) -> bool {
        self.strength.is_required()
    }

    /// The normalized expression of a linear constraint.
    pub fn expression(&self) -> Option<&Expression> {
        match &self.kind {
            ConstraintKind::LinearEquality(expr) | ConstraintKind::LinearInequality(expr, _) => {
                Some(expr)
            }
            ConstraintKind::Edit(_) | ConstraintKind::Stay(_) => None,
        }
    }

    /// The target variable of an edit or stay constraint.
    pub fn target(&self) -> Option<Variable> {
        match self.kind {
            ConstraintKind::Edit(var) | ConstraintKind::Stay(var) => Some(var),
            _ => None,
        }
    }

    /// Every variable the constraint mentions.
    pub fn variables(&self) -> Vec<Variable> {
        match &self.kind {
            ConstraintKind::LinearEquality(expr) | ConstraintKind::LinearInequality(expr, _) => {
                let mut vars: Vec<_> = expr.keys().collect();
                vars.sort_unstable();
                vars
            }
            ConstraintKind::Edit(var) | ConstraintKind::Stay(var) => vec![*var],
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ConstraintKind::LinearEquality(expr) => write!(f, "{} == 0", expr)?,
            ConstraintKind::LinearInequality(expr, Inequality::LessOrEqual) => {
                write!(f, "{} <= 0", expr)?
            }
            ConstraintKind::LinearInequality(expr, Inequality::GreaterOrEqual) => {
                write!(f, "{} >= 0", expr)?
            }
            ConstraintKind::Edit(var) => write!(f, "edit {}", var)?,
            ConstraintKind::Stay(var) => write!(f, "stay {}", var)?,
        }
        write!(f, " [{}]", self.strength)
    }
}
