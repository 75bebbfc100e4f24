use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a model is in its `initialize -> step* -> finalize` lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifecycle {
    /// Built, scheme not yet initialised
    Uninitialized,
    /// Scheme initialised, steps may be taken
    Running,
    /// Scheme finalised, output frozen
    Finalized,
    /// A step or lifecycle call failed, the model cannot continue
    Failed,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifecycle::Uninitialized => "uninitialized",
            Lifecycle::Running => "running",
            Lifecycle::Finalized => "finalized",
            Lifecycle::Failed => "failed",
        };
        write!(f, "{name}")
    }
}
