//! Primal and dual simplex iterations over the tableau.
//!
//! Entering and leaving choices follow Bland's rule: among equally good
//! candidates (ratios within epsilon) the symbol created first wins, which
//! rules out cycling on degenerate pivots.

use tracing::trace;

use crate::error::SolverError;
use crate::expression::{near_zero, EPSILON};
use crate::tableau::{Row, Tableau, Tag};
use crate::variable::{Symbol, SymbolKind};

/// Which objective a primal optimization minimizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Objective {
    Main,
    /// Phase-one objective of a row added through an artificial variable
    Artificial,
}

impl Tableau {
    /// Run primal simplex until the objective has no negative coefficient.
    pub(crate) fn optimize(&mut self, target: Objective) -> Result<(), SolverError> {
        let limit = self.options.max_pivots;
        let mut remaining = limit;

        loop {
            let objective = match target {
                Objective::Main => &self.objective,
                Objective::Artificial => self
                    .artificial
                    .as_ref()
                    .ok_or(SolverError::Internal("artificial objective missing"))?,
            };
            let Some(entering) = entering_symbol(objective) else {
                return Ok(());
            };
            let leaving = self.leaving_row(entering).ok_or(SolverError::Unbounded)?;

            if remaining == 0 {
                return Err(SolverError::IterationLimit { limit });
            }
            remaining -= 1;
            self.pivot(entering, leaving)?;
        }
    }

    /// Run dual simplex until no restricted row is negative.
    ///
    /// Works through the queued infeasible rows, then rescans the rows for
    /// any negative restricted symbol the queue missed.
    pub(crate) fn dual_optimize(&mut self) -> Result<(), SolverError> {
        let limit = self.options.max_pivots;
        let mut remaining = limit;

        loop {
            while let Some(leaving) = self.infeasible_rows.pop() {
                let Some(row) = self.rows.get(&leaving) else {
                    continue;
                };
                if row.constant() >= -EPSILON {
                    continue;
                }
                let entering = self
                    .dual_entering_symbol(row)
                    .ok_or(SolverError::Internal("dual optimize found no entering symbol"))?;

                if remaining == 0 {
                    return Err(SolverError::IterationLimit { limit });
                }
                remaining -= 1;
                self.pivot(entering, leaving)?;
            }

            self.infeasible_rows = self.negative_rows();
            if self.infeasible_rows.is_empty() {
                return Ok(());
            }
        }
    }

    /// Restricted basic symbols with a negative constant, lowest id last.
    fn negative_rows(&self) -> Vec<Symbol> {
        let mut negative: Vec<Symbol> = self
            .rows
            .iter()
            .filter(|(basic, row)| basic.is_restricted() && row.constant() < -EPSILON)
            .map(|(&basic, _)| basic)
            .collect();
        negative.sort_unstable_by(|a, b| b.cmp(a));
        negative
    }

    /// Exchange a basic and a parametric symbol.
    pub(crate) fn pivot(&mut self, entering: Symbol, leaving: Symbol) -> Result<(), SolverError> {
        let mut row = self
            .take_row(leaving)
            .ok_or(SolverError::Internal("pivot on a non-basic symbol"))?;
        if !row.solve_for_pair(leaving, entering) {
            return Err(SolverError::Internal("entering symbol missing from the leaving row"));
        }
        self.substitute(entering, &row);
        self.insert_row(entering, row);
        self.pivots += 1;
        trace!(entering = %entering, leaving = %leaving, "Pivot");
        Ok(())
    }

    /// Minimum-ratio test for a primal pivot.
    ///
    /// Only restricted rows in which `entering` has a negative coefficient
    /// can leave; external rows are unbounded in both directions.
    fn leaving_row(&self, entering: Symbol) -> Option<Symbol> {
        let users = self.columns.get(&entering)?;
        let mut best = None;
        for &basic in users {
            if basic.is_external() {
                continue;
            }
            let Some(row) = self.rows.get(&basic) else {
                continue;
            };
            let coeff = row.coefficient(entering);
            if coeff < -EPSILON {
                best = prefer_min_ratio(best, -row.constant() / coeff, basic);
            }
        }
        best.map(|(_, symbol)| symbol)
    }

    fn dual_entering_symbol(&self, row: &Row) -> Option<Symbol> {
        let mut best = None;
        for (symbol, coeff) in row.terms() {
            if symbol.is_dummy() || coeff <= EPSILON {
                continue;
            }
            let ratio = self.objective.coefficient(symbol) / coeff;
            best = prefer_min_ratio(best, ratio, symbol);
        }
        best.map(|(_, symbol)| symbol)
    }

    /// Row to pivot on when removing a constraint whose marker is parametric.
    ///
    /// Restricted rows where the marker has a negative coefficient come
    /// first, then other restricted rows, then external rows.
    pub(crate) fn marker_leaving_row(&self, marker: Symbol) -> Option<Symbol> {
        let users = self.columns.get(&marker)?;
        let mut first = None;
        let mut second = None;
        let mut third: Option<Symbol> = None;

        for &basic in users {
            let Some(row) = self.rows.get(&basic) else {
                continue;
            };
            let coeff = row.coefficient(marker);
            if basic.is_external() {
                third = Some(third.map_or(basic, |current| current.min(basic)));
            } else if coeff < 0.0 {
                first = prefer_min_ratio(first, -row.constant() / coeff, basic);
            } else {
                second = prefer_min_ratio(second, row.constant() / coeff, basic);
            }
        }
        first.or(second).map(|(_, symbol)| symbol).or(third)
    }

    /// Add a row with no usable subject by minimizing an artificial variable.
    ///
    /// Returns false when the artificial variable cannot be driven to zero.
    /// The tableau is then left mid-phase and the caller restores it.
    pub(crate) fn add_with_artificial_variable(
        &mut self,
        row: Row,
        tag: &Tag,
    ) -> Result<bool, SolverError> {
        let art = self.new_symbol(SymbolKind::Slack);
        self.artificial = Some(row.clone());
        self.insert_row(art, row);

        let outcome = self.optimize(Objective::Artificial);
        let residual = self
            .artificial
            .take()
            .map_or(0.0, |objective| objective.constant());
        outcome?;
        if !near_zero(residual) {
            trace!(residual, "Artificial variable stayed positive");
            return Ok(false);
        }

        if let Some(mut row) = self.take_row(art) {
            if !row.is_constant() {
                let entering = row
                    .keys()
                    .filter(|s| s.is_pivotable())
                    .min()
                    .or_else(|| row.contains(tag.marker).then_some(tag.marker));
                let Some(entering) = entering else {
                    return Ok(false);
                };
                if !row.solve_for_pair(art, entering) {
                    return Err(SolverError::Internal("entering symbol missing from the artificial row"));
                }
                self.substitute(entering, &row);
                self.insert_row(entering, row);
            }
        }

        self.remove_column(art);
        self.objective.remove_term(art);
        Ok(true)
    }
}

/// Keep the smaller ratio; near-equal ratios go to the lower symbol.
fn prefer_min_ratio(
    best: Option<(f64, Symbol)>,
    ratio: f64,
    symbol: Symbol,
) -> Option<(f64, Symbol)> {
    match best {
        Some((current, holder))
            if current < ratio - EPSILON
                || ((current - ratio).abs() <= EPSILON && holder < symbol) =>
        {
            Some((current, holder))
        }
        _ => Some((ratio, symbol)),
    }
}

/// Lowest non-dummy symbol with a negative objective coefficient.
fn entering_symbol(objective: &Row) -> Option<Symbol> {
    objective
        .terms()
        .filter(|&(symbol, coeff)| !symbol.is_dummy() && coeff < -EPSILON)
        .map(|(symbol, _)| symbol)
        .min()
}
