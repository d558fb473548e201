//! The simplex tableau and its constraint API.
//!
//! Rows map a basic symbol to an expression over parametric symbols. The
//! column map is the inverse index: for each parametric symbol, the set of
//! basic symbols whose rows mention it. Both maps only change through
//! [`Tableau::insert_row`], [`Tableau::take_row`], [`Tableau::substitute`]
//! and [`Tableau::remove_column`], which keep them mutual inverses.

use std::fmt;

use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};
use tracing::{debug, warn};

use crate::constraint::{Constraint, ConstraintId, ConstraintKind, Inequality};
use crate::error::SolverError;
use crate::expression::{near_zero, Expression, LinearExpression, TermChange, EPSILON};
use crate::options::SolverOptions;
use crate::simplex::Objective;
use crate::strength::Strength;
use crate::variable::{Symbol, SymbolKind, Variable, VariableArena};

/// A tableau row: the value of its basic symbol in terms of parametric ones.
pub(crate) type Row = LinearExpression<Symbol>;

type RowMap = IndexMap<Symbol, Row, FxBuildHasher>;
type ColumnMap = FxHashMap<Symbol, FxHashSet<Symbol>>;

/// Symbols that track a constraint's movement through the tableau.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Tag {
    /// Slack, dummy or plus-error symbol identifying the constraint's row
    pub(crate) marker: Symbol,
    /// Error symbol paired with the marker, for non-required constraints
    pub(crate) other: Option<Symbol>,
}

#[derive(Debug, Clone)]
struct ConstraintRecord {
    constraint: Constraint,
    tag: Tag,
}

#[derive(Debug, Clone, Copy)]
struct EditInfo {
    constraint: ConstraintId,
    tag: Tag,
    constant: f64,
}

/// Saved structural state, restored when an add or remove fails.
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    rows: RowMap,
    columns: ColumnMap,
    objective: Row,
    infeasible_rows: Vec<Symbol>,
}

/// The Cassowary constraint solver.
#[derive(Debug)]
pub struct Tableau {
    pub(crate) options: SolverOptions,
    variables: VariableArena,
    next_symbol: usize,
    next_constraint: usize,
    pub(crate) rows: RowMap,
    pub(crate) columns: ColumnMap,
    pub(crate) infeasible_rows: Vec<Symbol>,
    objective_symbol: Symbol,
    pub(crate) objective: Row,
    /// Phase-one objective, present only while adding an artificial row
    pub(crate) artificial: Option<Row>,
    constraints: IndexMap<ConstraintId, ConstraintRecord, FxBuildHasher>,
    edits: IndexMap<Variable, EditInfo, FxBuildHasher>,
    /// Pivots performed by the current public operation
    pub(crate) pivots: usize,
}

impl Default for Tableau {
    fn default() -> Self {
        Self::new()
    }
}

impl Tableau {
    /// Create an empty tableau with default options.
    pub fn new() -> Self {
        Self::with_options(SolverOptions::default())
    }

    /// Create an empty tableau.
    pub fn with_options(options: SolverOptions) -> Self {
        Self {
            options,
            variables: VariableArena::new(),
            next_symbol: 1,
            next_constraint: 0,
            rows: RowMap::default(),
            columns: ColumnMap::default(),
            infeasible_rows: Vec::new(),
            objective_symbol: Symbol::new(0, SymbolKind::Objective),
            objective: Row::default(),
            artificial: None,
            constraints: IndexMap::default(),
            edits: IndexMap::default(),
            pivots: 0,
        }
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Create a new external variable.
    pub fn new_variable(&mut self, name: impl Into<String>) -> Variable {
        let symbol = self.new_symbol(SymbolKind::External);
        self.variables.insert(name.into(), symbol)
    }

    /// The variables owned by this tableau.
    pub fn variables(&self) -> &VariableArena {
        &self.variables
    }

    pub fn variable_name(&self, var: Variable) -> Option<&str> {
        self.variables.name(var)
    }

    /// Get the current value of a variable.
    ///
    /// Values are refreshed by `resolve`, `update_variables` and, unless
    /// disabled in the options, every add or remove.
    pub fn value(&self, var: Variable) -> f64 {
        self.variables.value(var).unwrap_or(0.0)
    }

    /// Add a constraint to the tableau.
    ///
    /// Either the constraint is added and its id returned, or the tableau
    /// is left unchanged. Fails with [`SolverError::RequiredConflict`] when
    /// a required constraint cannot be satisfied together with the
    /// required constraints already present.
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<ConstraintId, SolverError> {
        self.validate(&constraint)?;
        self.pivots = 0;

        let snapshot = self.snapshot();
        let (tag, pinned) = match self.insert_constraint(&constraint) {
            Ok(inserted) => inserted,
            Err(err) => {
                self.restore(snapshot);
                if err == SolverError::RequiredConflict {
                    warn!(constraint = %constraint, "Rejected conflicting required constraint");
                }
                return Err(err);
            }
        };

        let id = ConstraintId(self.next_constraint);
        self.next_constraint += 1;

        if let (ConstraintKind::Edit(var), Some(constant)) = (constraint.kind(), pinned) {
            self.edits.insert(
                *var,
                EditInfo {
                    constraint: id,
                    tag,
                    constant,
                },
            );
        }

        debug!(id = %id, constraint = %constraint, rows = self.rows.len(), pivots = self.pivots, "Added constraint");
        self.constraints.insert(id, ConstraintRecord { constraint, tag });

        if self.options.auto_update {
            self.update_variables();
        }
        Ok(id)
    }

    /// Bring a constraint's row into the tableau and re-optimize.
    ///
    /// Returns the row's tag and, for edits and stays, the value the
    /// variable is pinned at. The caller restores the tableau on error.
    fn insert_constraint(&mut self, constraint: &Constraint) -> Result<(Tag, Option<f64>), SolverError> {
        // Pending suggestions are settled first; the primal pass below
        // assumes a feasible tableau.
        self.dual_optimize()?;

        let pinned = constraint.target().map(|var| self.solved_value(var));
        let (mut row, tag) = self.create_row(constraint);
        let mut subject = choose_subject(&row, &tag);

        // A row made only of dummy symbols is either redundant (zero
        // constant) or contradicts the required equalities it was built from.
        if subject.is_none() && row.keys().all(Symbol::is_dummy) {
            if !near_zero(row.constant()) {
                return Err(SolverError::RequiredConflict);
            }
            subject = Some(tag.marker);
        }

        match subject {
            Some(subject) => {
                if !row.solve_for(subject) {
                    return Err(SolverError::Internal("subject missing from its row"));
                }
                self.substitute(subject, &row);
                self.insert_row(subject, row);
            }
            None => {
                if !self.add_with_artificial_variable(row, &tag)? {
                    return Err(SolverError::RequiredConflict);
                }
            }
        }

        self.optimize(Objective::Main)?;
        self.dual_optimize()?;
        Ok((tag, pinned))
    }

    /// Add several constraints, stopping at the first failure.
    pub fn add_constraints<I>(&mut self, constraints: I) -> Result<Vec<ConstraintId>, SolverError>
    where
        I: IntoIterator<Item = Constraint>,
    {
        constraints
            .into_iter()
            .map(|constraint| self.add_constraint(constraint))
            .collect()
    }

    /// Remove a constraint, undoing every row and column its addition created.
    ///
    /// On error the constraint stays in place and the tableau is unchanged.
    pub fn remove_constraint(&mut self, id: ConstraintId) -> Result<(), SolverError> {
        let record = self
            .constraints
            .get(&id)
            .ok_or(SolverError::UnknownConstraint(id))?;
        let tag = record.tag;
        let weight = record.constraint.strength().value();
        let edit = match record.constraint.kind() {
            ConstraintKind::Edit(var) => Some(*var),
            _ => None,
        };
        self.pivots = 0;

        let snapshot = self.snapshot();
        if let Err(err) = self.extract_constraint(tag, weight) {
            self.restore(snapshot);
            return Err(err);
        }

        self.constraints.shift_remove(&id);
        if let Some(var) = edit {
            self.edits.shift_remove(&var);
        }
        if self.options.auto_update {
            self.update_variables();
        }
        debug!(id = %id, rows = self.rows.len(), pivots = self.pivots, "Removed constraint");
        Ok(())
    }

    /// Take a constraint's row and symbols out of the tableau and re-optimize.
    fn extract_constraint(&mut self, tag: Tag, weight: f64) -> Result<(), SolverError> {
        self.dual_optimize()?;

        // Error weights leave the objective before any pivoting, otherwise
        // substitutions would carry them into other terms.
        self.remove_error_effects(tag.marker, weight);
        if let Some(other) = tag.other {
            self.remove_error_effects(other, weight);
        }

        if self.take_row(tag.marker).is_none() {
            if let Some(leaving) = self.marker_leaving_row(tag.marker) {
                let mut row = self
                    .take_row(leaving)
                    .ok_or(SolverError::Internal("leaving row vanished"))?;
                if !row.solve_for_pair(leaving, tag.marker) {
                    return Err(SolverError::Internal("marker missing from the leaving row"));
                }
                self.substitute(tag.marker, &row);
            }
        }
        if let Some(other) = tag.other {
            self.discard_symbol(other);
        }

        self.optimize(Objective::Main)?;
        self.dual_optimize()
    }

    pub fn has_constraint(&self, id: ConstraintId) -> bool {
        self.constraints.contains_key(&id)
    }

    pub fn constraint(&self, id: ConstraintId) -> Option<&Constraint> {
        self.constraints.get(&id).map(|record| &record.constraint)
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Add an edit constraint on `var`, pinned at its currently solved value.
    pub fn add_edit_variable(&mut self, var: Variable, strength: Strength) -> Result<(), SolverError> {
        self.add_constraint(Constraint::edit(var, strength)).map(|_| ())
    }

    /// Remove the edit constraint on `var`.
    pub fn remove_edit_variable(&mut self, var: Variable) -> Result<(), SolverError> {
        let info = self
            .edits
            .get(&var)
            .ok_or(SolverError::UnknownEditVariable(var))?;
        self.remove_constraint(info.constraint)
    }

    pub fn has_edit_variable(&self, var: Variable) -> bool {
        self.edits.contains_key(&var)
    }

    /// Add a stay constraint keeping `var` near its current value.
    pub fn add_stay(&mut self, var: Variable, strength: Strength) -> Result<ConstraintId, SolverError> {
        self.add_constraint(Constraint::stay(var, strength))
    }

    /// Suggest a new value for an edit variable.
    ///
    /// Only the row constants move; [`Tableau::resolve`] restores
    /// feasibility and refreshes the values. A later add or remove settles
    /// pending suggestions before touching the tableau.
    pub fn suggest_value(&mut self, var: Variable, value: f64) -> Result<(), SolverError> {
        let info = self
            .edits
            .get_mut(&var)
            .ok_or(SolverError::UnknownEditVariable(var))?;
        let delta = value - info.constant;
        info.constant = value;
        let tag = info.tag;

        if let Some(row) = self.rows.get_mut(&tag.marker) {
            row.add_constant(-delta);
            if row.constant() < -EPSILON {
                self.infeasible_rows.push(tag.marker);
            }
        } else if let Some((other, row)) = tag
            .other
            .and_then(|other| self.rows.get_mut(&other).map(|row| (other, row)))
        {
            row.add_constant(delta);
            if row.constant() < -EPSILON {
                self.infeasible_rows.push(other);
            }
        } else {
            for basic in self.column_users(tag.marker) {
                if let Some(row) = self.rows.get_mut(&basic) {
                    row.add_constant(delta * row.coefficient(tag.marker));
                    if basic.is_restricted() && row.constant() < -EPSILON {
                        self.infeasible_rows.push(basic);
                    }
                }
            }
        }
        debug!(variable = %var, value, infeasible = self.infeasible_rows.len(), "Suggested value");
        Ok(())
    }

    /// Restore feasibility after suggestions and refresh variable values.
    pub fn resolve(&mut self) -> Result<(), SolverError> {
        self.pivots = 0;
        self.dual_optimize()?;
        self.reset_stay_constants();
        self.update_variables();
        debug!(pivots = self.pivots, "Resolved tableau");
        Ok(())
    }

    /// Value of a variable in the current basic solution, ignoring the cache.
    fn solved_value(&self, var: Variable) -> f64 {
        self.variables
            .symbol(var)
            .and_then(|symbol| self.rows.get(&symbol))
            .map_or(0.0, Row::constant)
    }

    /// Copy the solved value of every external variable into the arena.
    pub fn update_variables(&mut self) {
        let rows = &self.rows;
        let values: Vec<(Variable, f64)> = self
            .variables
            .symbols()
            .map(|(var, symbol)| (var, rows.get(&symbol).map_or(0.0, Row::constant)))
            .collect();
        for (var, value) in values {
            self.variables.set_value(var, value);
        }
    }

    /// Drop every constraint, keeping the variables (their values reset to zero).
    pub fn reset(&mut self) {
        self.rows.clear();
        self.columns.clear();
        self.infeasible_rows.clear();
        self.objective = Row::default();
        self.artificial = None;
        self.constraints.clear();
        self.edits.clear();
        self.variables.zero_values();
        self.pivots = 0;
    }

    /// Number of rows (basic symbols).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of parametric symbols referenced by at least one row.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// True when every restricted basic symbol is non-negative.
    pub fn is_feasible(&self) -> bool {
        self.rows
            .iter()
            .all(|(basic, row)| !basic.is_restricted() || row.constant() >= -EPSILON)
    }

    /// Verify the structural invariants of the row and column maps.
    pub fn check_invariants(&self) -> Result<(), SolverError> {
        let violation = |message: String| Err(SolverError::InvariantViolation(message));

        for (&basic, row) in &self.rows {
            if basic == self.objective_symbol {
                return violation("objective symbol is basic".to_string());
            }
            for (symbol, coeff) in row.terms() {
                if symbol == basic {
                    return violation(format!("row {} references itself", basic));
                }
                if self.rows.contains_key(&symbol) {
                    return violation(format!("row {} references basic symbol {}", basic, symbol));
                }
                if near_zero(coeff) {
                    return violation(format!("row {} stores a zero coefficient for {}", basic, symbol));
                }
                if !self.columns.get(&symbol).is_some_and(|users| users.contains(&basic)) {
                    return violation(format!("column {} does not list row {}", symbol, basic));
                }
            }
        }

        for (&symbol, users) in &self.columns {
            if users.is_empty() {
                return violation(format!("column {} is empty", symbol));
            }
            for &basic in users {
                if !self.rows.get(&basic).is_some_and(|row| row.contains(symbol)) {
                    return violation(format!("column {} lists row {} which does not use it", symbol, basic));
                }
            }
        }

        if let Some(symbol) = self.objective.keys().find(|s| self.rows.contains_key(s)) {
            return violation(format!("objective references basic symbol {}", symbol));
        }
        Ok(())
    }

    pub(crate) fn new_symbol(&mut self, kind: SymbolKind) -> Symbol {
        let symbol = Symbol::new(self.next_symbol, kind);
        self.next_symbol += 1;
        symbol
    }

    fn validate(&self, constraint: &Constraint) -> Result<(), SolverError> {
        if let Some(var) = constraint
            .variables()
            .into_iter()
            .find(|&var| !self.variables.contains(var))
        {
            return Err(SolverError::UnknownVariable(var));
        }
        if constraint.target().is_some() && constraint.is_required() {
            return Err(SolverError::RequiredEditStrength);
        }
        if let ConstraintKind::Edit(var) = constraint.kind() {
            if self.edits.contains_key(var) {
                return Err(SolverError::DuplicateEditVariable(*var));
            }
        }
        Ok(())
    }

    /// Build the row for a constraint.
    ///
    /// Basic variables are substituted by their rows, slack/error/dummy
    /// symbols are appended, error symbols are weighted into the objective
    /// and the row is negated if needed so its constant is non-negative.
    fn create_row(&mut self, constraint: &Constraint) -> (Row, Tag) {
        let (expression, inequality) = match constraint.kind() {
            ConstraintKind::LinearEquality(expr) => (expr.clone(), None),
            ConstraintKind::LinearInequality(expr, inequality) => (expr.clone(), Some(*inequality)),
            ConstraintKind::Edit(var) | ConstraintKind::Stay(var) => {
                (Expression::from(*var) - self.solved_value(*var), None)
            }
        };

        let mut row = Row::from_constant(expression.constant());
        for (var, coeff) in expression.terms() {
            let Some(symbol) = self.variables.symbol(var) else {
                continue;
            };
            match self.rows.get(&symbol) {
                Some(basic_row) => row.add_expression(basic_row, coeff),
                None => {
                    row.add_term(symbol, coeff);
                }
            }
        }

        let strength = constraint.strength();
        let tag = match inequality {
            Some(inequality) => {
                let coeff = match inequality {
                    Inequality::LessOrEqual => 1.0,
                    Inequality::GreaterOrEqual => -1.0,
                };
                let slack = self.new_symbol(SymbolKind::Slack);
                row.insert_term(slack, coeff);

                if strength.is_required() {
                    Tag {
                        marker: slack,
                        other: None,
                    }
                } else {
                    let error = self.new_symbol(SymbolKind::Error);
                    row.insert_term(error, -coeff);
                    self.objective.add_term(error, strength.value());
                    Tag {
                        marker: slack,
                        other: Some(error),
                    }
                }
            }
            None if strength.is_required() => {
                let dummy = self.new_symbol(SymbolKind::Dummy);
                row.insert_term(dummy, 1.0);
                Tag {
                    marker: dummy,
                    other: None,
                }
            }
            None => {
                let plus = self.new_symbol(SymbolKind::Error);
                let minus = self.new_symbol(SymbolKind::Error);
                row.insert_term(plus, -1.0);
                row.insert_term(minus, 1.0);
                self.objective.add_term(plus, strength.value());
                self.objective.add_term(minus, strength.value());
                Tag {
                    marker: plus,
                    other: Some(minus),
                }
            }
        };

        if row.constant() < 0.0 {
            row.multiply_by(-1.0);
        }
        (row, tag)
    }

    /// Take the weight of an error symbol back out of the objective.
    fn remove_error_effects(&mut self, symbol: Symbol, weight: f64) {
        if !symbol.is_error() {
            return;
        }
        match self.rows.get(&symbol) {
            Some(row) => self.objective.add_expression(row, -weight),
            None => {
                self.objective.add_term(symbol, -weight);
            }
        }
    }

    /// Remove a symbol that no constraint refers to any more.
    fn discard_symbol(&mut self, symbol: Symbol) {
        if self.take_row(symbol).is_none() {
            self.remove_column(symbol);
        }
        self.objective.remove_term(symbol);
    }

    /// Re-pin stay constraints to the current values of their variables.
    fn reset_stay_constants(&mut self) {
        for record in self.constraints.values() {
            if !matches!(record.constraint.kind(), ConstraintKind::Stay(_)) {
                continue;
            }
            let tag = record.tag;
            if let Some(row) = self.rows.get_mut(&tag.marker) {
                row.set_constant(0.0);
            } else if let Some(row) = tag.other.and_then(|other| self.rows.get_mut(&other)) {
                row.set_constant(0.0);
            }
        }
    }

    /// Basic symbols whose rows mention `symbol`, in symbol order.
    pub(crate) fn column_users(&self, symbol: Symbol) -> Vec<Symbol> {
        let mut users: Vec<Symbol> = self
            .columns
            .get(&symbol)
            .map(|users| users.iter().copied().collect())
            .unwrap_or_default();
        users.sort_unstable();
        users
    }

    /// Insert a row and index its terms in the column map.
    pub(crate) fn insert_row(&mut self, basic: Symbol, row: Row) {
        for symbol in row.keys() {
            self.columns.entry(symbol).or_default().insert(basic);
        }
        self.rows.insert(basic, row);
    }

    /// Remove a row and its column entries.
    pub(crate) fn take_row(&mut self, basic: Symbol) -> Option<Row> {
        let row = self.rows.swap_remove(&basic)?;
        for symbol in row.keys() {
            unlink(&mut self.columns, symbol, basic);
        }
        Some(row)
    }

    /// Drop a parametric symbol from every row (fixing it at zero).
    pub(crate) fn remove_column(&mut self, symbol: Symbol) {
        if let Some(users) = self.columns.remove(&symbol) {
            for basic in users {
                if let Some(row) = self.rows.get_mut(&basic) {
                    row.remove_term(symbol);
                }
            }
        }
    }

    /// Replace a parametric symbol by `expr` in every row and objective.
    ///
    /// Restricted rows whose constant turns negative are queued as infeasible.
    pub(crate) fn substitute(&mut self, symbol: Symbol, expr: &Row) {
        if let Some(users) = self.columns.remove(&symbol) {
            let mut users: Vec<Symbol> = users.into_iter().collect();
            users.sort_unstable();

            for basic in users {
                let Some(row) = self.rows.get_mut(&basic) else {
                    continue;
                };
                let Some(coeff) = row.remove_term(symbol) else {
                    continue;
                };
                row.add_constant(coeff * expr.constant());
                for (key, value) in expr.terms() {
                    match row.add_term(key, value * coeff) {
                        TermChange::Inserted => {
                            self.columns.entry(key).or_default().insert(basic);
                        }
                        TermChange::Removed => unlink(&mut self.columns, key, basic),
                        TermChange::Updated | TermChange::Unchanged => {}
                    }
                }
                if basic.is_restricted() && row.constant() < -EPSILON {
                    self.infeasible_rows.push(basic);
                }
            }
        }

        self.objective.substitute(symbol, expr);
        if let Some(artificial) = self.artificial.as_mut() {
            artificial.substitute(symbol, expr);
        }
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot {
            rows: self.rows.clone(),
            columns: self.columns.clone(),
            objective: self.objective.clone(),
            infeasible_rows: self.infeasible_rows.clone(),
        }
    }

    pub(crate) fn restore(&mut self, snapshot: Snapshot) {
        self.rows = snapshot.rows;
        self.columns = snapshot.columns;
        self.objective = snapshot.objective;
        self.infeasible_rows = snapshot.infeasible_rows;
        self.artificial = None;
    }
}

/// Choose the symbol a new row is solved for.
///
/// Prefers the lowest external symbol, then the marker or its paired error
/// symbol if pivotable with a negative coefficient.
fn choose_subject(row: &Row, tag: &Tag) -> Option<Symbol> {
    if let Some(external) = row.keys().filter(|s| s.is_external()).min() {
        return Some(external);
    }
    if tag.marker.is_pivotable() && row.coefficient(tag.marker) < 0.0 {
        return Some(tag.marker);
    }
    tag.other
        .filter(|&other| other.is_pivotable() && row.coefficient(other) < 0.0)
}

fn unlink(columns: &mut ColumnMap, symbol: Symbol, basic: Symbol) {
    if let Some(users) = columns.get_mut(&symbol) {
        users.remove(&basic);
        if users.is_empty() {
            columns.remove(&symbol);
        }
    }
}

impl fmt::Display for Tableau {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} = {}", self.objective_symbol, self.objective)?;

        let mut basics: Vec<_> = self.rows.keys().copied().collect();
        basics.sort_unstable();
        for basic in basics {
            if let Some(row) = self.rows.get(&basic) {
                writeln!(f, "{} = {}", basic, row)?;
            }
        }
        if !self.infeasible_rows.is_empty() {
            let names: Vec<String> = self.infeasible_rows.iter().map(Symbol::to_string).collect();
            writeln!(f, "infeasible: {}", names.join(", "))?;
        }
        Ok(())
    }
}
