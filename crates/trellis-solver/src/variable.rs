//! Variables and the internal symbols of the tableau.
//!
//! External variables are handles into a per-tableau arena. Every variable
//! is backed by an external [`Symbol`]; the tableau additionally creates
//! slack, error, dummy and objective symbols that never leave the solver.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_ARENA: AtomicU32 = AtomicU32::new(0);

/// Handle to an external layout variable.
///
/// Handles are only meaningful for the tableau that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable {
    arena: u32,
    index: u32,
}

impl Variable {
    /// Position of the variable in its arena.
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.index)
    }
}

/// The role a symbol plays in the tableau.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum SymbolKind {
    /// Backs a caller-visible [`Variable`]
    External,
    /// Non-negative slack of an inequality
    Slack,
    /// Non-negative error of a non-required constraint
    Error,
    /// Marker of a required equality; always zero
    Dummy,
    /// The objective row's own symbol
    Objective,
}

/// A tableau symbol. Ordered by id, which doubles as creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct Symbol {
    id: usize,
    kind: SymbolKind,
}

impl Symbol {
    pub(crate) fn new(id: usize, kind: SymbolKind) -> Self {
        Self { id, kind }
    }

    pub(crate) fn is_external(self) -> bool {
        self.kind == SymbolKind::External
    }

    pub(crate) fn is_error(self) -> bool {
        self.kind == SymbolKind::Error
    }

    pub(crate) fn is_dummy(self) -> bool {
        self.kind == SymbolKind::Dummy
    }

    /// Slack and error symbols may be chosen as a row subject.
    pub(crate) fn is_pivotable(self) -> bool {
        matches!(self.kind, SymbolKind::Slack | SymbolKind::Error)
    }

    /// Restricted symbols must stay non-negative.
    pub(crate) fn is_restricted(self) -> bool {
        !self.is_external()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            SymbolKind::External => "x",
            SymbolKind::Slack => "s",
            SymbolKind::Error => "e",
            SymbolKind::Dummy => "d",
            SymbolKind::Objective => "z",
        };
        write!(f, "{}{}", prefix, self.id)
    }
}

#[derive(Debug, Clone)]
struct VariableData {
    name: String,
    symbol: Symbol,
    value: f64,
}

/// Storage for the external variables of one tableau.
#[derive(Debug, Clone)]
pub struct VariableArena {
    id: u32,
    entries: Vec<VariableData>,
}

impl Default for VariableArena {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableArena {
    /// Create an empty arena with a process-unique identity.
    pub fn new() -> Self {
        Self {
            id: NEXT_ARENA.fetch_add(1, Ordering::Relaxed),
            entries: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, name: String, symbol: Symbol) -> Variable {
        let var = Variable {
            arena: self.id,
            index: self.entries.len() as u32,
        };
        self.entries.push(VariableData {
            name,
            symbol,
            value: 0.0,
        });
        var
    }

    fn get(&self, var: Variable) -> Option<&VariableData> {
        if var.arena != self.id {
            return None;
        }
        self.entries.get(var.index())
    }

    /// Check whether the handle was created by this arena.
    pub fn contains(&self, var: Variable) -> bool {
        self.get(var).is_some()
    }

    /// Debug name of a variable.
    pub fn name(&self, var: Variable) -> Option<&str> {
        self.get(var).map(|data| data.name.as_str())
    }

    /// Last value written by the solver.
    pub fn value(&self, var: Variable) -> Option<f64> {
        self.get(var).map(|data| data.value)
    }

    pub(crate) fn symbol(&self, var: Variable) -> Option<Symbol> {
        self.get(var).map(|data| data.symbol)
    }

    pub(crate) fn set_value(&mut self, var: Variable, value: f64) {
        if var.arena == self.id {
            if let Some(data) = self.entries.get_mut(var.index()) {
                data.value = value;
            }
        }
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over every variable together with its backing symbol.
    pub(crate) fn symbols(&self) -> impl Iterator<Item = (Variable, Symbol)> + '_ {
        let arena = self.id;
        self.entries.iter().enumerate().map(move |(index, data)| {
            (
                Variable {
                    arena,
                    index: index as u32,
                },
                data.symbol,
            )
        })
    }

    /// Iterate over all variable handles.
    pub fn iter(&self) -> impl Iterator<Item = Variable> + '_ {
        self.symbols().map(|(var, _)| var)
    }

    /// Forget the cached values, keeping the variables.
    pub(crate) fn zero_values(&mut self) {
        for data in &mut self.entries {
            data.value = 0.0;
        }
    }
}
