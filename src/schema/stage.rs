use serde::{Deserialize, Serialize};

/// The five choice stages of a stream challenge, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Location,
    Batch1,
    Batch2,
    Batch3,
    Mission,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Self::Location,
        Self::Batch1,
        Self::Batch2,
        Self::Batch3,
        Self::Mission,
    ];

    /// The stage that follows this one, or `None` after the mission.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Self::Location => Some(Self::Batch1),
            Self::Batch1 => Some(Self::Batch2),
            Self::Batch2 => Some(Self::Batch3),
            Self::Batch3 => Some(Self::Mission),
            Self::Mission => None,
        }
    }

    /// Returns true for the three negative-trait batches.
    pub fn is_trait_batch(&self) -> bool {
        matches!(self, Self::Batch1 | Self::Batch2 | Self::Batch3)
    }

    /// Parse a stage id such as `"location"` or `"batch2"`.
    pub fn parse(id: &str) -> Option<Stage> {
        match id.to_lowercase().as_str() {
            "location" => Some(Self::Location),
            "batch1" => Some(Self::Batch1),
            "batch2" => Some(Self::Batch2),
            "batch3" => Some(Self::Batch3),
            "mission" => Some(Self::Mission),
            _ => None,
        }
    }
}

/// One selectable option offered at a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOption {
    pub name: String,
    pub cost: i32,
}

/// What a single commit recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: Stage,
    pub choices: Vec<String>,
    pub cost: i32,
}

/// Summary of a stream session for the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChallenge {
    pub location: Option<String>,
    /// Traits from all three batches, skip wildcard removed.
    pub negative_traits: Vec<String>,
    pub missions: Vec<String>,
    pub remaining_points: i32,
    pub valid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_chain_in_order() {
        let mut stage = Some(Stage::Location);
        let mut seen = Vec::new();
        while let Some(s) = stage {
            seen.push(s);
            stage = s.next();
        }
        assert_eq!(seen, Stage::ALL.to_vec());
    }

    #[test]
    fn parse_stage_ids() {
        assert_eq!(Stage::parse("Location"), Some(Stage::Location));
        assert_eq!(Stage::parse("batch3"), Some(Stage::Batch3));
        assert_eq!(Stage::parse("batch4"), None);
    }

    #[test]
    fn trait_batches() {
        let batches: Vec<Stage> = Stage::ALL
            .into_iter()
            .filter(|s| s.is_trait_batch())
            .collect();
        assert_eq!(batches, vec![Stage::Batch1, Stage::Batch2, Stage::Batch3]);
    }
}
