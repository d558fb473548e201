//! Auto-layout for views built on trellis-solver.
//!
//! Each view owns four solver variables (left, top, width, height). Layout
//! constraints relate view attributes in the form
//! `view.attribute relation multiplier * other.attribute + constant` at a
//! priority on the `1..=1000` scale, and dragging a view edits its origin.
//!
//! # Example
//!
//! ```
//! use trellis_layout::{Attribute, LayoutConstraint, LayoutEngine};
//!
//! let mut engine = LayoutEngine::new();
//! let sidebar = engine.add_view("sidebar")?;
//! let content = engine.add_view("content")?;
//!
//! engine.add_constraint(LayoutConstraint::new(sidebar, Attribute::Left).fixed(0.0))?;
//! engine.add_constraint(LayoutConstraint::new(sidebar, Attribute::Width).fixed(240.0))?;
//! engine.add_constraint(
//!     LayoutConstraint::new(content, Attribute::Left).equal_to(sidebar, Attribute::Right),
//! )?;
//!
//! let solution = engine.solve()?;
//! let frame = solution.get(content).unwrap_or_default();
//! assert!((frame.x - 240.0).abs() < 1e-9);
//! for (view, frame) in solution.iter() {
//!     println!("{}: {:?}", engine.view_name(view).unwrap_or("?"), frame);
//! }
//! # Ok::<(), trellis_layout::LayoutError>(())
//! ```

mod attribute;
mod bounds;
mod engine;
mod error;

pub use attribute::{Attribute, Priority, ViewVars};
pub use bounds::Bounds;
pub use engine::{LayoutConstraint, LayoutConstraintId, LayoutEngine, LayoutOptions, Solution, ViewId};
pub use error::LayoutError;
