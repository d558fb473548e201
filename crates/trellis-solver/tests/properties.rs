//! Property tests over randomly generated constraint systems.

use proptest::prelude::*;
use trellis_solver::{Constraint, Expression, Relation, SolverError, Strength, Tableau, Variable};

const VARS: usize = 4;

/// `a * vars[i] + b * vars[j]  relation  offset`
#[derive(Debug, Clone)]
struct Relationship {
    lhs: (f64, usize),
    rhs: (f64, usize),
    relation: Relation,
    offset: f64,
}

impl Relationship {
    fn expression(&self, vars: &[Variable]) -> Expression {
        vars[self.lhs.1] * self.lhs.0 + vars[self.rhs.1] * self.rhs.0
    }

    fn evaluate(&self, values: &[f64]) -> f64 {
        values[self.lhs.1] * self.lhs.0 + values[self.rhs.1] * self.rhs.0
    }

    /// Constraint with `offset` as the right-hand side.
    fn constraint(&self, vars: &[Variable], strength: Strength) -> Constraint {
        Constraint::new(self.expression(vars), self.relation, self.offset, strength)
    }

    /// Constraint that `values` satisfy, loosened by `|offset|` for inequalities.
    fn satisfied_by(&self, vars: &[Variable], values: &[f64], strength: Strength) -> Constraint {
        let at = self.evaluate(values);
        let rhs = match self.relation {
            Relation::LessOrEqual => at + self.offset.abs(),
            Relation::Equal => at,
            Relation::GreaterOrEqual => at - self.offset.abs(),
        };
        Constraint::new(self.expression(vars), self.relation, rhs, strength)
    }
}

#[derive(Debug, Clone)]
enum Op {
    Add(Relationship, Strength),
    Remove(usize),
    Suggest(usize, f64),
}

fn coefficient() -> impl Strategy<Value = f64> {
    prop_oneof![Just(-2.0), Just(-1.0), Just(1.0), Just(2.0)]
}

fn relation() -> impl Strategy<Value = Relation> {
    prop_oneof![
        Just(Relation::LessOrEqual),
        Just(Relation::Equal),
        Just(Relation::GreaterOrEqual),
    ]
}

fn strength() -> impl Strategy<Value = Strength> {
    prop_oneof![
        Just(Strength::WEAK),
        Just(Strength::MEDIUM),
        Just(Strength::STRONG),
        Just(Strength::REQUIRED),
    ]
}

fn relationship() -> impl Strategy<Value = Relationship> {
    (coefficient(), 0..VARS, coefficient(), 0..VARS, relation(), -50i32..50).prop_map(
        |(a, i, b, j, relation, offset)| Relationship {
            lhs: (a, i),
            rhs: (b, j),
            relation,
            offset: f64::from(offset),
        },
    )
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (relationship(), strength()).prop_map(|(r, s)| Op::Add(r, s)),
        1 => (0usize..64).prop_map(Op::Remove),
        2 => (0..VARS, -200i32..200).prop_map(|(i, v)| Op::Suggest(i, f64::from(v))),
    ]
}

fn anchors() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec((-100i32..100).prop_map(f64::from), VARS)
}

/// A tableau whose unique optimum puts every variable at its anchor.
fn anchored(anchors: &[f64], required: &[Relationship]) -> (Tableau, Vec<Variable>) {
    let mut tableau = Tableau::new();
    let vars: Vec<Variable> = (0..VARS)
        .map(|i| tableau.new_variable(format!("x{}", i)))
        .collect();

    for (&var, &anchor) in vars.iter().zip(anchors) {
        tableau
            .add_constraint(Constraint::equal(var, anchor, Strength::MEDIUM))
            .unwrap();
    }
    for relationship in required {
        tableau
            .add_constraint(relationship.satisfied_by(&vars, anchors, Strength::REQUIRED))
            .unwrap();
    }
    (tableau, vars)
}

fn values(tableau: &Tableau, vars: &[Variable]) -> Vec<f64> {
    vars.iter().map(|&var| tableau.value(var)).collect()
}

/// A tableau with a strong edit on every variable.
fn edited() -> (Tableau, Vec<Variable>) {
    let mut tableau = Tableau::new();
    let vars: Vec<Variable> = (0..VARS)
        .map(|i| tableau.new_variable(format!("x{}", i)))
        .collect();
    for &var in &vars {
        tableau.add_edit_variable(var, Strength::STRONG).unwrap();
    }
    (tableau, vars)
}

/// Weighted error of `values` against the soft constraints and edit targets.
fn soft_error(values: &[f64], soft: &[(Relationship, Strength)], targets: &[f64]) -> f64 {
    let constraints: f64 = soft
        .iter()
        .map(|(relationship, strength)| {
            let diff = relationship.evaluate(values) - relationship.offset;
            let violation = match relationship.relation {
                Relation::LessOrEqual => diff.max(0.0),
                Relation::Equal => diff.abs(),
                Relation::GreaterOrEqual => (-diff).max(0.0),
            };
            strength.value() * violation
        })
        .sum();
    let edits: f64 = values
        .iter()
        .zip(targets)
        .map(|(value, target)| Strength::STRONG.value() * (value - target).abs())
        .sum();
    constraints + edits
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn anchored_system_solves_to_anchors(
        anchors in anchors(),
        required in prop::collection::vec(relationship(), 0..6),
    ) {
        let (mut tableau, vars) = anchored(&anchors, &required);
        tableau.resolve().unwrap();

        for (value, anchor) in values(&tableau, &vars).into_iter().zip(&anchors) {
            prop_assert!((value - anchor).abs() < 1e-6);
        }
        prop_assert!(tableau.is_feasible());
        prop_assert!(tableau.check_invariants().is_ok());
    }

    #[test]
    fn add_then_remove_is_observationally_neutral(
        anchors in anchors(),
        required in prop::collection::vec(relationship(), 0..6),
        extra in relationship(),
        extra_strength in strength(),
    ) {
        let (mut tableau, vars) = anchored(&anchors, &required);
        let rows = tableau.row_count();
        let columns = tableau.column_count();

        match tableau.add_constraint(extra.constraint(&vars, extra_strength)) {
            Ok(id) => {
                prop_assert!(tableau.check_invariants().is_ok());
                tableau.remove_constraint(id).unwrap();
            }
            Err(err) => prop_assert_eq!(err, SolverError::RequiredConflict),
        }

        prop_assert_eq!(tableau.row_count(), rows);
        prop_assert_eq!(tableau.column_count(), columns);
        for (value, anchor) in values(&tableau, &vars).into_iter().zip(&anchors) {
            prop_assert!((value - anchor).abs() < 1e-6);
        }
        prop_assert!(tableau.check_invariants().is_ok());
    }

    #[test]
    fn random_operations_keep_tableau_consistent(
        ops in prop::collection::vec(op(), 1..40),
    ) {
        let (mut tableau, vars) = edited();
        let mut added = Vec::new();

        for op in ops {
            match op {
                Op::Add(relationship, strength) => {
                    match tableau.add_constraint(relationship.constraint(&vars, strength)) {
                        Ok(id) => added.push(id),
                        Err(err) => prop_assert_eq!(err, SolverError::RequiredConflict),
                    }
                }
                Op::Remove(index) => {
                    if !added.is_empty() {
                        let id = added.swap_remove(index % added.len());
                        tableau.remove_constraint(id).unwrap();
                    }
                }
                Op::Suggest(index, value) => {
                    tableau.suggest_value(vars[index], value).unwrap();
                    tableau.resolve().unwrap();
                    prop_assert!(tableau.is_feasible());
                }
            }
            prop_assert!(tableau.check_invariants().is_ok());
        }

        tableau.resolve().unwrap();
        prop_assert!(tableau.is_feasible());
        prop_assert_eq!(tableau.constraint_count(), added.len() + VARS);
    }

    #[test]
    fn pending_suggestions_settle_like_resolved_ones(
        ops in prop::collection::vec(op(), 1..40),
    ) {
        // `pending` leaves suggestions unresolved across adds and removes,
        // `settled` resolves after each one.
        let (mut pending, vars) = edited();
        let (mut settled, settled_vars) = edited();
        let mut added = Vec::new();
        let mut targets = vec![0.0; VARS];

        for op in ops {
            match op {
                Op::Add(relationship, strength) => {
                    let result = pending.add_constraint(relationship.constraint(&vars, strength));
                    let mirrored = settled.add_constraint(relationship.constraint(&settled_vars, strength));
                    prop_assert_eq!(&result, &mirrored);
                    match result {
                        Ok(id) => {
                            let entry = (!strength.is_required()).then(|| (relationship, strength));
                            added.push((id, entry));
                        }
                        Err(err) => prop_assert_eq!(err, SolverError::RequiredConflict),
                    }
                }
                Op::Remove(index) => {
                    if !added.is_empty() {
                        let (id, _) = added.swap_remove(index % added.len());
                        pending.remove_constraint(id).unwrap();
                        settled.remove_constraint(id).unwrap();
                    }
                }
                Op::Suggest(index, value) => {
                    pending.suggest_value(vars[index], value).unwrap();
                    settled.suggest_value(settled_vars[index], value).unwrap();
                    settled.resolve().unwrap();
                    targets[index] = value;
                }
            }
            prop_assert!(pending.check_invariants().is_ok());
        }

        pending.resolve().unwrap();
        settled.resolve().unwrap();
        prop_assert!(pending.is_feasible());
        prop_assert!(settled.is_feasible());
        prop_assert_eq!(pending.constraint_count(), settled.constraint_count());

        let soft: Vec<(Relationship, Strength)> =
            added.into_iter().filter_map(|(_, entry)| entry).collect();
        let pending_error = soft_error(&values(&pending, &vars), &soft, &targets);
        let settled_error = soft_error(&values(&settled, &settled_vars), &soft, &targets);
        prop_assert!(
            (pending_error - settled_error).abs() <= 1e-2 + 1e-7 * settled_error.abs(),
            "pending {} vs settled {}",
            pending_error,
            settled_error
        );
    }
}
