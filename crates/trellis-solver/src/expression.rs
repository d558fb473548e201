//! Linear expressions of the form `constant + Σ(coefficient * term)`.
//!
//! The same type is used for caller-built expressions over [`Variable`]s and
//! for tableau rows over internal symbols. A coefficient that lands within
//! [`EPSILON`] of zero is dropped, so `contains` is equivalent to "has a
//! non-zero coefficient".

use std::fmt;
use std::hash::Hash;
use std::ops::{Add, Mul, Neg, Sub};

use rustc_hash::FxHashMap;

use crate::variable::Variable;

/// Tolerance for floating-point comparisons.
pub(crate) const EPSILON: f64 = 1e-8;

/// Near-zero check for floating point values.
pub(crate) fn near_zero(value: f64) -> bool {
    value.abs() < EPSILON
}

/// Effect of a single-term update on an expression's key set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermChange {
    /// The key was absent and now has a coefficient
    Inserted,
    /// The key was present and its coefficient changed
    Updated,
    /// The key's coefficient cancelled out and the key was removed
    Removed,
    /// Nothing changed
    Unchanged,
}

/// A linear expression keyed by `K`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearExpression<K: Copy + Eq + Hash> {
    constant: f64,
    terms: FxHashMap<K, f64>,
}

/// A caller-facing expression over external variables.
pub type Expression = LinearExpression<Variable>;

impl<K: Copy + Eq + Hash> Default for LinearExpression<K> {
    fn default() -> Self {
        Self::from_constant(0.0)
    }
}

impl<K: Copy + Eq + Hash> LinearExpression<K> {
    /// Create a constant expression.
    pub fn from_constant(constant: f64) -> Self {
        Self {
            constant,
            terms: FxHashMap::default(),
        }
    }

    /// Create an expression holding a single term.
    pub fn from_term(key: K, coefficient: f64) -> Self {
        let mut expr = Self::from_constant(0.0);
        expr.add_term(key, coefficient);
        expr
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn set_constant(&mut self, constant: f64) {
        self.constant = constant;
    }

    pub fn add_constant(&mut self, delta: f64) {
        self.constant += delta;
    }

    /// Add `coefficient` to the term for `key`, removing it if it cancels.
    pub fn add_term(&mut self, key: K, coefficient: f64) -> TermChange {
        if near_zero(coefficient) {
            return TermChange::Unchanged;
        }
        match self.terms.get_mut(&key) {
            Some(existing) => {
                *existing += coefficient;
                if near_zero(*existing) {
                    self.terms.remove(&key);
                    TermChange::Removed
                } else {
                    TermChange::Updated
                }
            }
            None => {
                self.terms.insert(key, coefficient);
                TermChange::Inserted
            }
        }
    }

    /// Set the coefficient for `key`, overwriting any previous value.
    pub fn insert_term(&mut self, key: K, coefficient: f64) -> TermChange {
        if near_zero(coefficient) {
            return match self.terms.remove(&key) {
                Some(_) => TermChange::Removed,
                None => TermChange::Unchanged,
            };
        }
        match self.terms.insert(key, coefficient) {
            Some(_) => TermChange::Updated,
            None => TermChange::Inserted,
        }
    }

    /// Remove the term for `key`, returning its coefficient.
    pub fn remove_term(&mut self, key: K) -> Option<f64> {
        self.terms.remove(&key)
    }

    /// Get the coefficient for a key (zero when absent).
    pub fn coefficient(&self, key: K) -> f64 {
        self.terms.get(&key).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, key: K) -> bool {
        self.terms.contains_key(&key)
    }

    /// Iterate over `(key, coefficient)` pairs in unspecified order.
    pub fn terms(&self) -> impl Iterator<Item = (K, f64)> + '_ {
        self.terms.iter().map(|(&key, &coeff)| (key, coeff))
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.terms.keys().copied()
    }

    /// Number of non-zero terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// True when the expression has no terms.
    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    /// Multiply the expression by a scalar.
    pub fn multiply_by(&mut self, scalar: f64) {
        self.constant *= scalar;
        if near_zero(scalar) {
            self.terms.clear();
            return;
        }
        for coeff in self.terms.values_mut() {
            *coeff *= scalar;
        }
    }

    /// Add `multiplier * other` to this expression.
    pub fn add_expression(&mut self, other: &Self, multiplier: f64) {
        self.constant += other.constant * multiplier;
        for (key, coeff) in other.terms() {
            self.add_term(key, coeff * multiplier);
        }
    }

    /// Replace `key` with `expr`, merging coefficients and constants.
    ///
    /// Returns false when `key` did not occur.
    pub fn substitute(&mut self, key: K, expr: &Self) -> bool {
        match self.terms.remove(&key) {
            Some(coeff) => {
                self.add_expression(expr, coeff);
                true
            }
            None => false,
        }
    }

    /// Rewrite `0 = self` as `key = ...`, removing `key` from the terms.
    ///
    /// Returns false, leaving the expression untouched, when `key` did not occur.
    pub fn solve_for(&mut self, key: K) -> bool {
        match self.terms.remove(&key) {
            Some(coeff) => {
                self.multiply_by(-1.0 / coeff);
                true
            }
            None => false,
        }
    }

    /// Rewrite `lhs = self` as `rhs = ...`.
    ///
    /// Returns false, leaving the expression untouched, when `rhs` did not occur.
    pub fn solve_for_pair(&mut self, lhs: K, rhs: K) -> bool {
        if !self.contains(rhs) {
            return false;
        }
        self.insert_term(lhs, -1.0);
        self.solve_for(rhs)
    }
}

impl<K: Copy + Eq + Hash + Ord + fmt::Display> fmt::Display for LinearExpression<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut terms: Vec<_> = self.terms().collect();
        terms.sort_by(|a, b| a.0.cmp(&b.0));

        write!(f, "{}", self.constant)?;
        for (key, coeff) in terms {
            if coeff < 0.0 {
                write!(f, " - {} * {}", -coeff, key)?;
            } else {
                write!(f, " + {} * {}", coeff, key)?;
            }
        }
        Ok(())
    }
}

impl From<Variable> for Expression {
    fn from(var: Variable) -> Self {
        Expression::from_term(var, 1.0)
    }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Self {
        Expression::from_constant(value)
    }
}

impl Add<Expression> for Expression {
    type Output = Expression;

    fn add(mut self, rhs: Expression) -> Expression {
        self.add_expression(&rhs, 1.0);
        self
    }
}

impl Add<Variable> for Expression {
    type Output = Expression;

    fn add(mut self, rhs: Variable) -> Expression {
        self.add_term(rhs, 1.0);
        self
    }
}

impl Add<f64> for Expression {
    type Output = Expression;

    fn add(mut self, rhs: f64) -> Expression {
        self.add_constant(rhs);
        self
    }
}

impl Sub<Expression> for Expression {
    type Output = Expression;

    fn sub(mut self, rhs: Expression) -> Expression {
        self.add_expression(&rhs, -1.0);
        self
    }
}

impl Sub<Variable> for Expression {
    type Output = Expression;

    fn sub(mut self, rhs: Variable) -> Expression {
        self.add_term(rhs, -1.0);
        self
    }
}

impl Sub<f64> for Expression {
    type Output = Expression;

    fn sub(mut self, rhs: f64) -> Expression {
        self.add_constant(-rhs);
        self
    }
}

impl Mul<f64> for Expression {
    type Output = Expression;

    fn mul(mut self, rhs: f64) -> Expression {
        self.multiply_by(rhs);
        self
    }
}

impl Mul<Expression> for f64 {
    type Output = Expression;

    fn mul(self, rhs: Expression) -> Expression {
        rhs * self
    }
}

impl Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Expression {
        self * -1.0
    }
}

impl<T: Into<Expression>> Add<T> for Variable {
    type Output = Expression;

    fn add(self, rhs: T) -> Expression {
        Expression::from(self) + rhs.into()
    }
}

impl<T: Into<Expression>> Sub<T> for Variable {
    type Output = Expression;

    fn sub(self, rhs: T) -> Expression {
        Expression::from(self) - rhs.into()
    }
}

impl Mul<f64> for Variable {
    type Output = Expression;

    fn mul(self, rhs: f64) -> Expression {
        Expression::from_term(self, rhs)
    }
}

impl Mul<Variable> for f64 {
    type Output = Expression;

    fn mul(self, rhs: Variable) -> Expression {
        Expression::from_term(rhs, self)
    }
}

impl Neg for Variable {
    type Output = Expression;

    fn neg(self) -> Expression {
        Expression::from_term(self, -1.0)
    }
}
