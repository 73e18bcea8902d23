/// Rule table: trait costs, exclusions, and per-difficulty constants,
/// loaded from RON and validated into immutable lookup structures.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::schema::challenge::Difficulty;
use crate::schema::stage::Stage;
use crate::schema::trait_kind::TraitKind;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("difficulty '{difficulty}' missing from {category}")]
    MissingDifficulty {
        category: &'static str,
        difficulty: String,
    },
    #[error("{category} for difficulty '{difficulty}' is empty")]
    EmptyCategory {
        category: &'static str,
        difficulty: String,
    },
    #[error("trait '{0}' is listed as both positive and negative")]
    AmbiguousTrait(String),
    #[error("trait '{0}' not found in rule table")]
    UnknownTrait(String),
    #[error("stream option '{name}' in {category} has no cost in the rule table")]
    UnknownStreamOption { category: &'static str, name: String },
}

// RON shape. Categories are keyed the way the data files are written;
// `RuleTable::from_raw` turns them into lookup structures.

#[derive(Debug, Deserialize)]
#[serde(rename = "RuleTable")]
struct RonRuleTable {
    positive_traits: BTreeMap<String, i32>,
    negative_traits: BTreeMap<String, i32>,
    #[serde(default)]
    negative_substitutes: BTreeMap<String, i32>,
    #[serde(default)]
    exclusions: BTreeMap<String, Vec<String>>,
    end_trait_value: BTreeMap<String, i32>,
    min_traits: BTreeMap<String, u32>,
    start_locations: BTreeMap<String, BTreeMap<String, i32>>,
    professions: BTreeMap<String, BTreeMap<String, i32>>,
    missions: BTreeMap<String, Vec<String>>,
    settings: BTreeMap<String, Vec<String>>,
}

/// The read-only catalog every allocation and session works against.
///
/// Catalog maps are ordered so that a seeded draw always sees the same
/// pool order.
#[derive(Debug, Clone)]
pub struct RuleTable {
    positive: BTreeMap<String, i32>,
    negative: BTreeMap<String, i32>,
    substitutes: BTreeMap<String, i32>,
    /// Symmetric: if `a` excludes `b`, `b` excludes `a`.
    exclusions: FxHashMap<String, FxHashSet<String>>,
    end_trait_value: BTreeMap<String, i32>,
    min_traits: BTreeMap<String, u32>,
    start_locations: BTreeMap<String, BTreeMap<String, i32>>,
    professions: BTreeMap<String, BTreeMap<String, i32>>,
    missions: BTreeMap<String, Vec<String>>,
    settings: BTreeMap<String, Vec<String>>,
}

/// Everything a difficulty needs, resolved up front so that a missing key
/// fails before anything random happens.
#[derive(Debug, Clone, Copy)]
pub struct DifficultyRules<'a> {
    pub end_trait_value: i32,
    pub min_traits: u32,
    pub start_locations: &'a BTreeMap<String, i32>,
    pub professions: &'a BTreeMap<String, i32>,
    pub missions: &'a [String],
    pub settings: &'a [String],
}

impl RuleTable {
    /// Load a rule table from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<RuleTable, RuleError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a rule table from a RON string.
    pub fn parse_ron(input: &str) -> Result<RuleTable, RuleError> {
        let raw: RonRuleTable = ron::from_str(input)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RonRuleTable) -> Result<RuleTable, RuleError> {
        if let Some(name) = raw
            .positive_traits
            .keys()
            .find(|name| raw.negative_traits.contains_key(*name))
        {
            return Err(RuleError::AmbiguousTrait(name.clone()));
        }

        let mut exclusions: FxHashMap<String, FxHashSet<String>> = FxHashMap::default();
        for (name, excluded) in raw.exclusions {
            for other in excluded {
                if other == name {
                    continue;
                }
                exclusions
                    .entry(name.clone())
                    .or_default()
                    .insert(other.clone());
                exclusions.entry(other).or_default().insert(name.clone());
            }
        }

        Ok(RuleTable {
            positive: raw.positive_traits,
            negative: raw.negative_traits,
            substitutes: raw.negative_substitutes,
            exclusions,
            end_trait_value: raw.end_trait_value,
            min_traits: raw.min_traits,
            start_locations: raw.start_locations,
            professions: raw.professions,
            missions: raw.missions,
            settings: raw.settings,
        })
    }

    /// All traits of one pool with their catalog cost, in catalog order.
    pub fn traits(&self, kind: TraitKind) -> impl Iterator<Item = (&str, i32)> {
        let catalog = match kind {
            TraitKind::Positive => &self.positive,
            TraitKind::Negative => &self.negative,
        };
        catalog.iter().map(|(name, cost)| (name.as_str(), *cost))
    }

    /// Look up which pool a trait is in and its catalog cost.
    pub fn lookup(&self, name: &str) -> Option<(TraitKind, i32)> {
        if let Some(cost) = self.positive.get(name) {
            return Some((TraitKind::Positive, *cost));
        }
        self.negative
            .get(name)
            .map(|cost| (TraitKind::Negative, *cost))
    }

    /// Catalog cost of a trait.
    pub fn cost(&self, name: &str) -> Result<i32, RuleError> {
        self.lookup(name)
            .map(|(_, cost)| cost)
            .ok_or_else(|| RuleError::UnknownTrait(name.to_string()))
    }

    /// Cost of a negative trait inside stage-limited selection: the
    /// substitute cost if one is set, otherwise the catalog cost.
    pub fn stage_cost(&self, name: &str) -> Option<i32> {
        self.substitutes
            .get(name)
            .or_else(|| self.negative.get(name))
            .copied()
    }

    /// Traits mutually exclusive with `name`.
    pub fn excluded_by(&self, name: &str) -> impl Iterator<Item = &str> {
        self.exclusions
            .get(name)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Returns true if `a` and `b` may not be selected together.
    pub fn are_exclusive(&self, a: &str, b: &str) -> bool {
        self.exclusions
            .get(a)
            .is_some_and(|set| set.contains(b))
    }

    /// Returns true if `name` is mutually exclusive with any of `selected`.
    pub fn conflicts_with<'s, I>(&self, name: &str, selected: I) -> bool
    where
        I: IntoIterator<Item = &'s str>,
    {
        let Some(excluded) = self.exclusions.get(name) else {
            return false;
        };
        selected.into_iter().any(|s| excluded.contains(s))
    }

    /// Every exclusion pair, each reported once with `a < b`.
    pub fn exclusion_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .exclusions
            .iter()
            .flat_map(|(a, set)| set.iter().map(move |b| (a.as_str(), b.as_str())))
            .filter(|(a, b)| a < b)
            .collect();
        pairs.sort_unstable();
        pairs
    }

    /// Difficulties that have an end trait value.
    pub fn difficulties(&self) -> impl Iterator<Item = Difficulty> + '_ {
        self.end_trait_value.keys().map(|d| Difficulty::new(d.as_str()))
    }

    pub fn end_trait_value(&self, difficulty: &Difficulty) -> Result<i32, RuleError> {
        lookup_difficulty(&self.end_trait_value, "end_trait_value", difficulty).copied()
    }

    pub fn min_traits(&self, difficulty: &Difficulty) -> Result<u32, RuleError> {
        lookup_difficulty(&self.min_traits, "min_traits", difficulty).copied()
    }

    /// Resolve every difficulty-keyed category for `difficulty`.
    pub fn difficulty(&self, difficulty: &Difficulty) -> Result<DifficultyRules<'_>, RuleError> {
        let end_trait_value = self.end_trait_value(difficulty)?;
        let min_traits = self.min_traits(difficulty)?;
        let start_locations = non_empty_map(
            lookup_difficulty(&self.start_locations, "start_locations", difficulty)?,
            "start_locations",
            difficulty,
        )?;
        let professions = non_empty_map(
            lookup_difficulty(&self.professions, "professions", difficulty)?,
            "professions",
            difficulty,
        )?;
        let missions = non_empty_list(
            lookup_difficulty(&self.missions, "missions", difficulty)?,
            "missions",
            difficulty,
        )?;
        let settings = non_empty_list(
            lookup_difficulty(&self.settings, "settings", difficulty)?,
            "settings",
            difficulty,
        )?;

        Ok(DifficultyRules {
            end_trait_value,
            min_traits,
            start_locations,
            professions,
            missions,
            settings,
        })
    }
}

fn lookup_difficulty<'a, T>(
    category: &'a BTreeMap<String, T>,
    name: &'static str,
    difficulty: &Difficulty,
) -> Result<&'a T, RuleError> {
    category
        .get(difficulty.name())
        .ok_or_else(|| RuleError::MissingDifficulty {
            category: name,
            difficulty: difficulty.to_string(),
        })
}

fn non_empty_map<'a>(
    map: &'a BTreeMap<String, i32>,
    category: &'static str,
    difficulty: &Difficulty,
) -> Result<&'a BTreeMap<String, i32>, RuleError> {
    if map.is_empty() {
        return Err(RuleError::EmptyCategory {
            category,
            difficulty: difficulty.to_string(),
        });
    }
    Ok(map)
}

fn non_empty_list<'a>(
    list: &'a [String],
    category: &'static str,
    difficulty: &Difficulty,
) -> Result<&'a [String], RuleError> {
    if list.is_empty() {
        return Err(RuleError::EmptyCategory {
            category,
            difficulty: difficulty.to_string(),
        });
    }
    Ok(list)
}

fn default_skip_option() -> String {
    "Select nothing".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename = "StreamRules")]
struct RonStreamRules {
    total_points: i32,
    #[serde(default = "default_skip_option")]
    skip_option: String,
    starting_areas: BTreeMap<String, i32>,
    batch_one: Vec<String>,
    batch_two: Vec<String>,
    batch_three: Vec<String>,
    missions: BTreeMap<String, i32>,
}

/// Catalogs for the stream challenge stages, with every trait option's
/// cost resolved against a [`RuleTable`] at load time.
#[derive(Debug, Clone)]
pub struct StreamRules {
    total_points: i32,
    skip_option: String,
    starting_areas: BTreeMap<String, i32>,
    batches: [Vec<(String, i32)>; 3],
    missions: BTreeMap<String, i32>,
}

impl StreamRules {
    pub fn load_from_ron(path: &Path, rules: &RuleTable) -> Result<StreamRules, RuleError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents, rules)
    }

    pub fn parse_ron(input: &str, rules: &RuleTable) -> Result<StreamRules, RuleError> {
        let raw: RonStreamRules = ron::from_str(input)?;

        let resolve = |category: &'static str, names: Vec<String>| {
            names
                .into_iter()
                .map(|name| match rules.stage_cost(&name) {
                    Some(cost) => Ok((name, cost)),
                    None => Err(RuleError::UnknownStreamOption { category, name }),
                })
                .collect::<Result<Vec<_>, RuleError>>()
        };

        let batches = [
            resolve("batch_one", raw.batch_one)?,
            resolve("batch_two", raw.batch_two)?,
            resolve("batch_three", raw.batch_three)?,
        ];

        Ok(StreamRules {
            total_points: raw.total_points,
            skip_option: raw.skip_option,
            starting_areas: raw.starting_areas,
            batches,
            missions: raw.missions,
        })
    }

    pub fn total_points(&self) -> i32 {
        self.total_points
    }

    /// The zero-cost "choose nothing" option offered in every trait batch.
    pub fn skip_option(&self) -> &str {
        &self.skip_option
    }

    /// The full catalog for a stage, before affordability or exclusion
    /// filtering. Trait batches include the skip option.
    pub fn catalog(&self, stage: Stage) -> Vec<(&str, i32)> {
        let batch = |i: usize| -> Vec<(&str, i32)> {
            std::iter::once((self.skip_option.as_str(), 0))
                .chain(self.batches[i].iter().map(|(n, c)| (n.as_str(), *c)))
                .collect()
        };
        match stage {
            Stage::Location => self
                .starting_areas
                .iter()
                .map(|(n, c)| (n.as_str(), *c))
                .collect(),
            Stage::Batch1 => batch(0),
            Stage::Batch2 => batch(1),
            Stage::Batch3 => batch(2),
            Stage::Mission => self
                .missions
                .iter()
                .map(|(n, c)| (n.as_str(), *c))
                .collect(),
        }
    }

    /// Cost of `name` at `stage`, or `None` if it is not in that catalog.
    pub fn option_cost(&self, stage: Stage, name: &str) -> Option<i32> {
        self.catalog(stage)
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, cost)| cost)
    }
}
