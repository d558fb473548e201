//! Solver configuration.

/// Options controlling a [`Tableau`](crate::Tableau).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SolverOptions {
    /// Upper bound on pivots per optimization pass
    pub max_pivots: usize,
    /// Refresh cached variable values after every add/remove
    pub auto_update: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_pivots: 10_000,
            auto_update: true,
        }
    }
}
