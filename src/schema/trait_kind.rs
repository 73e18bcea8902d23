use serde::{Deserialize, Serialize};

/// The pool a trait belongs to.
///
/// Positive traits carry negative point values and pull the running value
/// down; negative traits carry positive values and push it up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraitKind {
    Positive,
    Negative,
}

impl TraitKind {
    /// The pool the allocator draws from when the running value sits at
    /// `running` and has to reach `target`. Equality falls to the positive
    /// pool.
    pub fn toward(running: i32, target: i32) -> Self {
        if running < target {
            Self::Negative
        } else {
            Self::Positive
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
        }
    }
}
