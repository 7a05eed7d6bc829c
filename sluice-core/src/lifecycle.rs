//! Feature lifecycle states.

use std::fmt;

/// Where a feature is in its lifecycle.
///
/// `Uninitialized` → (`init`) → `Running` → (`dispose`) → `Disposed`.
/// `Disposed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifecycle {
    /// Constructed, `init` not called yet.
    #[default]
    Uninitialized,
    /// Accepting messages and dispatching effects.
    Running,
    /// Torn down; every further operation except `dispose` fails.
    Disposed,
}

impl Lifecycle {
    /// Returns `true` while the feature accepts messages.
    pub fn is_running(self) -> bool {
        matches!(self, Lifecycle::Running)
    }

    /// Returns `true` once the feature has been disposed.
    pub fn is_disposed(self) -> bool {
        matches!(self, Lifecycle::Disposed)
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Lifecycle::Uninitialized => "uninitialized",
            Lifecycle::Running => "running",
            Lifecycle::Disposed => "disposed",
        })
    }
}

/// A lifecycle-guarded feature operation, reported in lifecycle errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `Feature::init`.
    Init,
    /// `Feature::accept`.
    Accept,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Init => "init",
            Operation::Accept => "accept a message on",
        })
    }
}
