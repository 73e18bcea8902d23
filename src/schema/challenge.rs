use serde::{Deserialize, Serialize};
use std::fmt;

/// Difficulty name as keyed in the rule table ("Easy", "Hard", ...).
///
/// Kept open rather than an enum so a rule table can introduce new levels
/// without a code change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Difficulty(pub String);

impl Difficulty {
    /// The difficulty that skips the tolerance gate entirely.
    pub const IMPOSSIBLE: &'static str = "Impossible";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Returns true if trait draws for this difficulty ignore the tolerance
    /// threshold.
    pub fn is_ungated(&self) -> bool {
        self.0 == Self::IMPOSSIBLE
    }
}

impl From<&str> for Difficulty {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fully generated challenge, ready to hand to a renderer.
///
/// When `succeeded` is false the trait lists are partial and a renderer
/// should show a "generation failed, please retry" outcome instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub difficulty: Difficulty,
    pub location: String,
    pub profession: String,
    pub mission: String,
    pub settings: String,
    pub positive_traits: Vec<String>,
    pub negative_traits: Vec<String>,
    pub target_value: i32,
    pub final_value: i32,
    pub succeeded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_impossible_is_ungated() {
        assert!(Difficulty::from("Impossible").is_ungated());
        assert!(!Difficulty::from("Hard").is_ungated());
        assert!(!Difficulty::from("impossible").is_ungated());
    }

    #[test]
    fn difficulty_serializes_as_plain_string() {
        let d = Difficulty::new("Easy");
        assert_eq!(ron::to_string(&d).unwrap(), "\"Easy\"");
        assert_eq!(d.to_string(), "Easy");
    }
}
