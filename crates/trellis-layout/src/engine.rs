//! Views, anchor constraints and dragging on top of the solver.

use std::fmt;

use glam::DVec2;
use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;
use tracing::{debug, trace};
use trellis_solver::{Constraint, ConstraintId, Expression, Relation, Tableau};

use crate::attribute::{Attribute, Priority, ViewVars};
use crate::bounds::Bounds;
use crate::error::LayoutError;

/// Identifier of a view inside a layout engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(usize);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view{}", self.0)
    }
}

/// Identifier of a layout constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutConstraintId(usize);

impl fmt::Display for LayoutConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Options for the layout engine.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LayoutOptions {
    /// Give every view a required `width >= 0` and `height >= 0`
    pub non_negative_sizes: bool,
    /// Priority of the edits that move a dragged view; must not be required
    pub drag_priority: Priority,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            non_negative_sizes: true,
            drag_priority: Priority::HIGH,
        }
    }
}

/// `view.attribute  relation  multiplier * target.attribute + constant`
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConstraint {
    view: ViewId,
    attribute: Attribute,
    relation: Relation,
    target: Option<(ViewId, Attribute)>,
    multiplier: f64,
    constant: f64,
    priority: Priority,
}

impl LayoutConstraint {
    /// Start a constraint on `view.attribute`; by default it pins the
    /// attribute to zero at required priority.
    pub fn new(view: ViewId, attribute: Attribute) -> Self {
        Self {
            view,
            attribute,
            relation: Relation::Equal,
            target: None,
            multiplier: 1.0,
            constant: 0.0,
            priority: Priority::REQUIRED,
        }
    }

    pub fn equal_to(self, view: ViewId, attribute: Attribute) -> Self {
        self.related(Relation::Equal, Some((view, attribute)))
    }

    pub fn less_or_equal_to(self, view: ViewId, attribute: Attribute) -> Self {
        self.related(Relation::LessOrEqual, Some((view, attribute)))
    }

    pub fn greater_or_equal_to(self, view: ViewId, attribute: Attribute) -> Self {
        self.related(Relation::GreaterOrEqual, Some((view, attribute)))
    }

    /// `view.attribute == value`
    pub fn fixed(self, value: f64) -> Self {
        self.related(Relation::Equal, None).constant(value)
    }

    /// `view.attribute >= value`
    pub fn at_least(self, value: f64) -> Self {
        self.related(Relation::GreaterOrEqual, None).constant(value)
    }

    /// `view.attribute <= value`
    pub fn at_most(self, value: f64) -> Self {
        self.related(Relation::LessOrEqual, None).constant(value)
    }

    pub fn constant(mut self, constant: f64) -> Self {
        self.constant = constant;
        self
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    fn related(mut self, relation: Relation, target: Option<(ViewId, Attribute)>) -> Self {
        self.relation = relation;
        self.target = target;
        self
    }

    pub fn view(&self) -> ViewId {
        self.view
    }

    pub fn priority_value(&self) -> Priority {
        self.priority
    }

    /// The views this constraint mentions.
    pub fn views(&self) -> SmallVec<[ViewId; 2]> {
        let mut views = SmallVec::new();
        views.push(self.view);
        if let Some((target, _)) = self.target {
            if target != self.view {
                views.push(target);
            }
        }
        views
    }
}

impl fmt::Display for LayoutConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let relation = match self.relation {
            Relation::LessOrEqual => "<=",
            Relation::Equal => "==",
            Relation::GreaterOrEqual => ">=",
        };
        write!(f, "{}.{} {} ", self.view, self.attribute, relation)?;
        match self.target {
            Some((view, attribute)) => write!(
                f,
                "{} * {}.{} + {}",
                self.multiplier, view, attribute, self.constant
            )?,
            None => write!(f, "{}", self.constant)?,
        }
        write!(f, " @{}", self.priority)
    }
}

#[derive(Debug, Clone)]
struct View {
    name: String,
    vars: ViewVars,
}

/// Solved frames of every view, in creation order.
#[derive(Debug, Clone, Default)]
pub struct Solution {
    pub frames: IndexMap<ViewId, Bounds>,
}

impl Solution {
    pub fn get(&self, view: ViewId) -> Option<Bounds> {
        self.frames.get(&view).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ViewId, Bounds)> + '_ {
        self.frames.iter().map(|(&view, &bounds)| (view, bounds))
    }
}

/// Auto-layout over views, backed by a constraint tableau.
#[derive(Debug)]
pub struct LayoutEngine {
    options: LayoutOptions,
    tableau: Tableau,
    views: Vec<View>,
    constraints: IndexMap<LayoutConstraintId, (LayoutConstraint, ConstraintId)>,
    dragging: IndexSet<ViewId>,
    next_constraint: usize,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self::with_options(LayoutOptions::default())
    }

    pub fn with_options(options: LayoutOptions) -> Self {
        Self {
            options,
            tableau: Tableau::new(),
            views: Vec::new(),
            constraints: IndexMap::new(),
            dragging: IndexSet::new(),
            next_constraint: 0,
        }
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    /// The underlying tableau, for inspection.
    pub fn tableau(&self) -> &Tableau {
        &self.tableau
    }

    /// Add a view with its own left/top/width/height variables.
    pub fn add_view(&mut self, name: impl Into<String>) -> Result<ViewId, LayoutError> {
        let name = name.into();
        let vars = ViewVars {
            left: self.tableau.new_variable(format!("{}.left", name)),
            top: self.tableau.new_variable(format!("{}.top", name)),
            width: self.tableau.new_variable(format!("{}.width", name)),
            height: self.tableau.new_variable(format!("{}.height", name)),
        };

        if self.options.non_negative_sizes {
            let required = Priority::REQUIRED.strength();
            self.add_all([
                Constraint::greater_or_equal(vars.width, 0.0, required),
                Constraint::greater_or_equal(vars.height, 0.0, required),
            ])?;
        }

        let id = ViewId(self.views.len());
        debug!(view = %id, name = %name, "Added view");
        self.views.push(View { name, vars });
        Ok(id)
    }

    /// Add solver constraints together; on failure the ones already added
    /// are removed again.
    fn add_all<I>(&mut self, constraints: I) -> Result<SmallVec<[ConstraintId; 2]>, LayoutError>
    where
        I: IntoIterator<Item = Constraint>,
    {
        let mut added = SmallVec::new();
        for constraint in constraints {
            match self.tableau.add_constraint(constraint) {
                Ok(id) => added.push(id),
                Err(err) => {
                    for id in added.into_iter().rev() {
                        self.tableau.remove_constraint(id)?;
                    }
                    return Err(err.into());
                }
            }
        }
        Ok(added)
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    pub fn view_name(&self, view: ViewId) -> Option<&str> {
        self.views.get(view.0).map(|v| v.name.as_str())
    }

    fn vars(&self, view: ViewId) -> Result<ViewVars, LayoutError> {
        self.views
            .get(view.0)
            .map(|v| v.vars)
            .ok_or(LayoutError::UnknownView(view))
    }

    /// Add a layout constraint. A required constraint that conflicts with
    /// the existing required ones is rejected and nothing changes.
    pub fn add_constraint(
        &mut self,
        constraint: LayoutConstraint,
    ) -> Result<LayoutConstraintId, LayoutError> {
        let lhs = constraint.attribute.expression(&self.vars(constraint.view)?);
        let mut rhs = Expression::from_constant(constraint.constant);
        if let Some((target, attribute)) = constraint.target {
            let target_expr = attribute.expression(&self.vars(target)?);
            rhs.add_expression(&target_expr, constraint.multiplier);
        }

        let solver_constraint = Constraint::new(
            lhs,
            constraint.relation,
            rhs,
            constraint.priority.strength(),
        );
        let solver_id = self.tableau.add_constraint(solver_constraint)?;

        let id = LayoutConstraintId(self.next_constraint);
        self.next_constraint += 1;
        debug!(id = %id, constraint = %constraint, "Added layout constraint");
        self.constraints.insert(id, (constraint, solver_id));
        Ok(id)
    }

    /// Remove a layout constraint, returning it.
    pub fn remove_constraint(
        &mut self,
        id: LayoutConstraintId,
    ) -> Result<LayoutConstraint, LayoutError> {
        let (constraint, solver_id) = self
            .constraints
            .shift_remove(&id)
            .ok_or(LayoutError::UnknownConstraint(id))?;
        self.tableau.remove_constraint(solver_id)?;
        debug!(id = %id, "Removed layout constraint");
        Ok(constraint)
    }

    pub fn constraint(&self, id: LayoutConstraintId) -> Option<&LayoutConstraint> {
        self.constraints.get(&id).map(|(constraint, _)| constraint)
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Start moving a view: its origin becomes editable.
    pub fn begin_drag(&mut self, view: ViewId) -> Result<(), LayoutError> {
        let vars = self.vars(view)?;
        if self.dragging.contains(&view) {
            return Err(LayoutError::AlreadyDragging(view));
        }
        let strength = self.options.drag_priority.strength();
        self.tableau.add_edit_variable(vars.left, strength)?;
        if let Err(err) = self.tableau.add_edit_variable(vars.top, strength) {
            self.tableau.remove_edit_variable(vars.left)?;
            return Err(err.into());
        }
        self.dragging.insert(view);
        debug!(view = %view, "Began drag");
        Ok(())
    }

    /// Move a dragged view's origin towards `position` and re-solve.
    pub fn drag_to(&mut self, view: ViewId, position: DVec2) -> Result<Bounds, LayoutError> {
        let vars = self.vars(view)?;
        if !self.dragging.contains(&view) {
            return Err(LayoutError::NotDragging(view));
        }
        self.tableau.suggest_value(vars.left, position.x)?;
        self.tableau.suggest_value(vars.top, position.y)?;
        self.tableau.resolve()?;

        let bounds = self.read_bounds(&vars);
        trace!(view = %view, x = bounds.x, y = bounds.y, "Dragged view");
        Ok(bounds)
    }

    /// Stop moving a view.
    pub fn end_drag(&mut self, view: ViewId) -> Result<(), LayoutError> {
        let vars = self.vars(view)?;
        if !self.dragging.shift_remove(&view) {
            return Err(LayoutError::NotDragging(view));
        }
        self.tableau.remove_edit_variable(vars.left)?;
        self.tableau.remove_edit_variable(vars.top)?;
        debug!(view = %view, "Ended drag");
        Ok(())
    }

    pub fn is_dragging(&self, view: ViewId) -> bool {
        self.dragging.contains(&view)
    }

    /// Resolve the tableau and read back every view's frame.
    pub fn solve(&mut self) -> Result<Solution, LayoutError> {
        self.tableau.resolve()?;
        let frames = self
            .views
            .iter()
            .enumerate()
            .map(|(index, view)| (ViewId(index), self.read_bounds(&view.vars)))
            .collect();
        Ok(Solution { frames })
    }

    /// The current frame of a view, as of the last solve.
    pub fn bounds(&self, view: ViewId) -> Result<Bounds, LayoutError> {
        Ok(self.read_bounds(&self.vars(view)?))
    }

    fn read_bounds(&self, vars: &ViewVars) -> Bounds {
        Bounds::new(
            self.tableau.value(vars.left),
            self.tableau.value(vars.top),
            self.tableau.value(vars.width),
            self.tableau.value(vars.height),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_solver::SolverError;

    fn near(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn sized(engine: &mut LayoutEngine, name: &str, width: f64, height: f64) -> ViewId {
        let view = engine.add_view(name).unwrap();
        engine
            .add_constraint(LayoutConstraint::new(view, Attribute::Width).fixed(width))
            .unwrap();
        engine
            .add_constraint(LayoutConstraint::new(view, Attribute::Height).fixed(height))
            .unwrap();
        view
    }

    #[test]
    fn test_views_in_a_row() {
        let mut engine = LayoutEngine::new();
        let a = sized(&mut engine, "a", 100.0, 20.0);
        let b = engine.add_view("b").unwrap();

        engine
            .add_constraint(LayoutConstraint::new(a, Attribute::Left).fixed(0.0))
            .unwrap();
        engine
            .add_constraint(LayoutConstraint::new(a, Attribute::Top).fixed(5.0))
            .unwrap();
        engine
            .add_constraint(
                LayoutConstraint::new(b, Attribute::Left)
                    .equal_to(a, Attribute::Right)
                    .constant(10.0),
            )
            .unwrap();
        engine
            .add_constraint(
                LayoutConstraint::new(b, Attribute::Width)
                    .equal_to(a, Attribute::Width)
                    .multiplier(0.5),
            )
            .unwrap();
        engine
            .add_constraint(LayoutConstraint::new(b, Attribute::Top).equal_to(a, Attribute::Top))
            .unwrap();
        engine
            .add_constraint(LayoutConstraint::new(b, Attribute::Height).equal_to(a, Attribute::Height))
            .unwrap();

        let solution = engine.solve().unwrap();
        let frame = solution.get(a).unwrap();
        assert!(near(frame.x, 0.0) && near(frame.y, 5.0));
        assert!(near(frame.width, 100.0) && near(frame.height, 20.0));

        let frame = solution.get(b).unwrap();
        assert!(near(frame.x, 110.0));
        assert!(near(frame.y, 5.0));
        assert!(near(frame.width, 50.0));
        assert!(near(frame.height, 20.0));
    }

    #[test]
    fn test_center_alignment() {
        let mut engine = LayoutEngine::new();
        let parent = sized(&mut engine, "parent", 100.0, 100.0);
        let child = sized(&mut engine, "child", 20.0, 10.0);

        engine
            .add_constraint(LayoutConstraint::new(parent, Attribute::Left).fixed(0.0))
            .unwrap();
        engine
            .add_constraint(LayoutConstraint::new(parent, Attribute::Top).fixed(0.0))
            .unwrap();
        engine
            .add_constraint(
                LayoutConstraint::new(child, Attribute::CenterX).equal_to(parent, Attribute::CenterX),
            )
            .unwrap();
        engine
            .add_constraint(
                LayoutConstraint::new(child, Attribute::CenterY).equal_to(parent, Attribute::CenterY),
            )
            .unwrap();

        engine.solve().unwrap();
        let frame = engine.bounds(child).unwrap();
        assert!(near(frame.x, 40.0));
        assert!(near(frame.y, 45.0));
    }

    #[test]
    fn test_higher_priority_wins() {
        let mut engine = LayoutEngine::new();
        let view = engine.add_view("v").unwrap();

        engine
            .add_constraint(
                LayoutConstraint::new(view, Attribute::Width)
                    .fixed(100.0)
                    .priority(Priority::LOW),
            )
            .unwrap();
        let high = engine
            .add_constraint(
                LayoutConstraint::new(view, Attribute::Width)
                    .fixed(40.0)
                    .priority(Priority::HIGH),
            )
            .unwrap();
        assert!(near(engine.solve().unwrap().get(view).unwrap().width, 40.0));

        engine.remove_constraint(high).unwrap();
        assert!(near(engine.solve().unwrap().get(view).unwrap().width, 100.0));
    }

    #[test]
    fn test_non_negative_sizes() {
        let mut engine = LayoutEngine::new();
        let view = engine.add_view("v").unwrap();

        engine
            .add_constraint(
                LayoutConstraint::new(view, Attribute::Width)
                    .fixed(-30.0)
                    .priority(Priority::MEDIUM),
            )
            .unwrap();
        assert!(near(engine.solve().unwrap().get(view).unwrap().width, 0.0));

        let result = engine.add_constraint(LayoutConstraint::new(view, Attribute::Height).at_most(-1.0));
        assert_eq!(result, Err(LayoutError::Solver(SolverError::RequiredConflict)));
    }

    #[test]
    fn test_grouped_constraints_roll_back_together() {
        let mut engine = LayoutEngine::new();
        let x = engine.tableau.new_variable("x");
        let required = Priority::REQUIRED.strength();
        let rows = engine.tableau().row_count();

        let result = engine.add_all([
            Constraint::greater_or_equal(x, 0.0, required),
            Constraint::less_or_equal(x, -1.0, required),
        ]);
        assert_eq!(result, Err(LayoutError::Solver(SolverError::RequiredConflict)));
        assert_eq!(engine.tableau().constraint_count(), 0);
        assert_eq!(engine.tableau().row_count(), rows);

        let added = engine
            .add_all([
                Constraint::greater_or_equal(x, 0.0, required),
                Constraint::less_or_equal(x, 10.0, required),
            ])
            .unwrap();
        assert_eq!(added.len(), 2);
        assert_eq!(engine.tableau().constraint_count(), 2);
    }

    #[test]
    fn test_add_view_registers_size_bounds() {
        let mut engine = LayoutEngine::new();
        engine.add_view("a").unwrap();
        assert_eq!(engine.tableau().constraint_count(), 2);

        let mut unbounded = LayoutEngine::with_options(LayoutOptions {
            non_negative_sizes: false,
            ..LayoutOptions::default()
        });
        unbounded.add_view("a").unwrap();
        assert_eq!(unbounded.tableau().constraint_count(), 0);
    }

    #[test]
    fn test_conflict_is_rejected_atomically() {
        let mut engine = LayoutEngine::new();
        let view = sized(&mut engine, "v", 50.0, 50.0);
        let count = engine.constraint_count();

        let result = engine.add_constraint(LayoutConstraint::new(view, Attribute::Width).fixed(60.0));
        assert_eq!(result, Err(LayoutError::Solver(SolverError::RequiredConflict)));
        assert_eq!(engine.constraint_count(), count);
        assert!(near(engine.solve().unwrap().get(view).unwrap().width, 50.0));
    }

    #[test]
    fn test_drag_is_clamped_to_container() {
        let mut engine = LayoutEngine::new();
        let view = sized(&mut engine, "v", 50.0, 10.0);
        engine
            .add_constraint(LayoutConstraint::new(view, Attribute::Left).at_least(0.0))
            .unwrap();
        engine
            .add_constraint(LayoutConstraint::new(view, Attribute::Right).at_most(300.0))
            .unwrap();

        engine.begin_drag(view).unwrap();
        assert_eq!(engine.begin_drag(view), Err(LayoutError::AlreadyDragging(view)));

        let frame = engine.drag_to(view, DVec2::new(-20.0, 30.0)).unwrap();
        assert!(near(frame.x, 0.0));
        assert!(near(frame.y, 30.0));

        let frame = engine.drag_to(view, DVec2::new(280.0, 0.0)).unwrap();
        assert!(near(frame.x, 250.0));
        assert!(near(frame.y, 0.0));
        assert!(near(frame.right(), 300.0));

        engine.end_drag(view).unwrap();
        assert!(!engine.is_dragging(view));
        assert_eq!(
            engine.drag_to(view, DVec2::ZERO),
            Err(LayoutError::NotDragging(view))
        );
        assert_eq!(engine.end_drag(view), Err(LayoutError::NotDragging(view)));
    }

    #[test]
    fn test_unknown_ids() {
        let mut engine = LayoutEngine::new();
        let view = engine.add_view("v").unwrap();
        let ghost = ViewId(7);

        let result = engine.add_constraint(LayoutConstraint::new(view, Attribute::Left).equal_to(ghost, Attribute::Left));
        assert_eq!(result, Err(LayoutError::UnknownView(ghost)));
        assert_eq!(engine.bounds(ghost), Err(LayoutError::UnknownView(ghost)));

        let id = engine
            .add_constraint(LayoutConstraint::new(view, Attribute::Left).fixed(1.0))
            .unwrap();
        engine.remove_constraint(id).unwrap();
        assert_eq!(
            engine.remove_constraint(id),
            Err(LayoutError::UnknownConstraint(id))
        );
    }

    #[test]
    fn test_display() {
        let a = ViewId(0);
        let b = ViewId(1);
        let constraint = LayoutConstraint::new(a, Attribute::Left)
            .equal_to(b, Attribute::Right)
            .constant(8.0)
            .priority(Priority::HIGH);
        assert_eq!(constraint.to_string(), "view0.left == 1 * view1.right + 8 @750");
        assert_eq!(constraint.views().as_slice(), &[a, b]);
    }
}
