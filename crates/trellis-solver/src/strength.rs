//! Constraint strengths.
//!
//! A strength packs a (strong, medium, weak) triple into one weight so that
//! each level dominates the ones below it: a single strong violation costs
//! more than any realistic number of medium ones. Required sits above all
//! three and is never traded off.

use std::cmp::Ordering;
use std::fmt;

const LEVEL_SCALE: f64 = 1_000.0;

/// Symbolic priority level of a strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StrengthLevel {
    Weak,
    Medium,
    Strong,
    Required,
}

/// Constraint strength (priority).
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Strength(f64);

impl Strength {
    pub const REQUIRED: Strength = Strength(1_001_001_000.0);
    pub const STRONG: Strength = Strength(1_000_000.0);
    pub const MEDIUM: Strength = Strength(1_000.0);
    pub const WEAK: Strength = Strength(1.0);

    /// Create a strength from a (strong, medium, weak) triple.
    pub fn new(strong: f64, medium: f64, weak: f64) -> Self {
        Self::with_weight(strong, medium, weak, 1.0)
    }

    /// Create a strength from a triple scaled by `weight`.
    ///
    /// Each component is clamped to `0..=1000` after scaling.
    pub fn with_weight(strong: f64, medium: f64, weak: f64, weight: f64) -> Self {
        let clamp = |v: f64| (v * weight).clamp(0.0, LEVEL_SCALE);
        let value = clamp(strong) * LEVEL_SCALE * LEVEL_SCALE
            + clamp(medium) * LEVEL_SCALE
            + clamp(weak);
        Self::from_value(value)
    }

    /// Create a strength from a raw weight, clipped to `0..=REQUIRED`.
    pub fn from_value(value: f64) -> Self {
        if value.is_nan() {
            return Strength(0.0);
        }
        Strength(value.clamp(0.0, Self::REQUIRED.0))
    }

    /// The raw weight used in the objective function.
    pub fn value(self) -> f64 {
        self.0
    }

    /// Check if this is a required constraint.
    pub fn is_required(self) -> bool {
        self.0 >= Self::REQUIRED.0
    }

    /// The highest level with a non-zero component.
    pub fn level(self) -> StrengthLevel {
        if self.is_required() {
            StrengthLevel::Required
        } else if self.0 >= Self::STRONG.0 {
            StrengthLevel::Strong
        } else if self.0 >= Self::MEDIUM.0 {
            StrengthLevel::Medium
        } else {
            StrengthLevel::Weak
        }
    }
}

impl Default for Strength {
    fn default() -> Self {
        Self::REQUIRED
    }
}

impl PartialEq for Strength {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Strength {}

impl PartialOrd for Strength {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Strength {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level() {
            StrengthLevel::Required => write!(f, "required"),
            StrengthLevel::Strong => write!(f, "strong({})", self.0),
            StrengthLevel::Medium => write!(f, "medium({})", self.0),
            StrengthLevel::Weak => write!(f, "weak({})", self.0),
        }
    }
}
