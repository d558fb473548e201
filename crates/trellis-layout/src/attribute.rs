//! View attributes and layout priorities.

use std::fmt;

use smallvec::{smallvec, SmallVec};
use trellis_solver::{Expression, Strength, Variable};

/// Solver variables backing one view.
#[derive(Debug, Clone, Copy)]
pub struct ViewVars {
    pub left: Variable,
    pub top: Variable,
    pub width: Variable,
    pub height: Variable,
}

/// A geometric attribute of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Attribute {
    Left,
    Right,
    Top,
    Bottom,
    Width,
    Height,
    CenterX,
    CenterY,
}

impl Attribute {
    /// The attribute as weighted view variables.
    pub fn terms(self, vars: &ViewVars) -> SmallVec<[(Variable, f64); 2]> {
        match self {
            Attribute::Left => smallvec![(vars.left, 1.0)],
            Attribute::Top => smallvec![(vars.top, 1.0)],
            Attribute::Width => smallvec![(vars.width, 1.0)],
            Attribute::Height => smallvec![(vars.height, 1.0)],
            Attribute::Right => smallvec![(vars.left, 1.0), (vars.width, 1.0)],
            Attribute::Bottom => smallvec![(vars.top, 1.0), (vars.height, 1.0)],
            Attribute::CenterX => smallvec![(vars.left, 1.0), (vars.width, 0.5)],
            Attribute::CenterY => smallvec![(vars.top, 1.0), (vars.height, 0.5)],
        }
    }

    /// The attribute as a solver expression.
    pub fn expression(self, vars: &ViewVars) -> Expression {
        let mut expr = Expression::default();
        for (var, coeff) in self.terms(vars) {
            expr.add_term(var, coeff);
        }
        expr
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Attribute::Left => "left",
            Attribute::Right => "right",
            Attribute::Top => "top",
            Attribute::Bottom => "bottom",
            Attribute::Width => "width",
            Attribute::Height => "height",
            Attribute::CenterX => "centerX",
            Attribute::CenterY => "centerY",
        };
        f.write_str(name)
    }
}

/// Layout priority on a `1..=1000` scale.
///
/// 1000 is required. From 750 a priority maps to the strong level, from 250
/// to medium and below that to weak; inside a level the weight grows with
/// the priority, so a higher priority always wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Priority(u16);

impl Priority {
    pub const REQUIRED: Priority = Priority(1000);
    pub const HIGH: Priority = Priority(750);
    pub const MEDIUM: Priority = Priority(500);
    pub const LOW: Priority = Priority(250);
    pub const FITTING: Priority = Priority(50);

    /// Create a priority, clamped to `1..=1000`.
    pub fn new(value: u16) -> Self {
        Priority(value.clamp(1, 1000))
    }

    pub fn value(self) -> u16 {
        self.0
    }

    pub fn is_required(self) -> bool {
        self.0 >= Self::REQUIRED.0
    }

    /// The solver strength for this priority.
    pub fn strength(self) -> Strength {
        let p = f64::from(self.0);
        if self.is_required() {
            Strength::REQUIRED
        } else if self >= Self::HIGH {
            Strength::new(p / 750.0, 0.0, 0.0)
        } else if self >= Self::LOW {
            Strength::new(0.0, p / 250.0, 0.0)
        } else {
            Strength::new(0.0, 0.0, p / 250.0)
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::REQUIRED
    }
}

impl From<Priority> for Strength {
    fn from(priority: Priority) -> Self {
        priority.strength()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
