/// The challenge generator: Difficulty → Challenge orchestration.
///
/// Wires together rule lookup, the location/profession/mission draws and
/// the trait allocator.

use rand::rngs::StdRng;
use rand::seq::{IteratorRandom, SliceRandom};
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::allocator::{AllocationError, Allocator, AllocatorConfig};
use crate::core::rules::{RuleError, RuleTable};
use crate::schema::challenge::{Challenge, Difficulty};

#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("rule error: {0}")]
    Rules(#[from] RuleError),
    #[error("allocation error: {0}")]
    Allocation(#[from] AllocationError),
    #[error("no rule table: call rules_path() or with_rules() before build()")]
    MissingRules,
}

/// Builds challenges for any difficulty in its rule table. Built via
/// `ChallengeGenerator::builder()`.
pub struct ChallengeGenerator {
    rules: RuleTable,
    config: AllocatorConfig,
    max_attempts: u32,
    seed: u64,
    generation_count: u64,
}

/// Builder for constructing a `ChallengeGenerator`.
pub struct ChallengeGeneratorBuilder {
    rules_path: Option<PathBuf>,
    /// Directly provided rules (for testing without files).
    rules: Option<RuleTable>,
    config: AllocatorConfig,
    max_attempts: u32,
    seed: u64,
}

impl ChallengeGenerator {
    pub fn builder() -> ChallengeGeneratorBuilder {
        ChallengeGeneratorBuilder {
            rules_path: None,
            rules: None,
            config: AllocatorConfig::default(),
            max_attempts: 3,
            seed: 0,
        }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Generate one challenge. A failed allocation is returned as a
    /// challenge with `succeeded == false`.
    pub fn generate(&mut self, difficulty: &Difficulty) -> Result<Challenge, ChallengeError> {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(self.generation_count));
        self.generation_count += 1;
        self.generate_from(difficulty, &mut rng)
    }

    /// Generate until an allocation succeeds or `max_attempts` runs out.
    /// Returns the last attempt either way.
    pub fn generate_with_retries(
        &mut self,
        difficulty: &Difficulty,
    ) -> Result<Challenge, ChallengeError> {
        let attempts = self.max_attempts.max(1);
        let base = self.seed.wrapping_add(self.generation_count);
        self.generation_count += 1;

        let mut attempt: u32 = 0;
        loop {
            let mut rng = StdRng::seed_from_u64(
                base.wrapping_add(u64::from(attempt) * 7919), // prime offset per attempt
            );
            let challenge = self.generate_from(difficulty, &mut rng)?;
            attempt += 1;
            if challenge.succeeded || attempt >= attempts {
                return Ok(challenge);
            }
            debug!(%difficulty, attempt, "allocation failed, retrying");
        }
    }

    /// Generate one challenge from a caller-supplied rng.
    ///
    /// Every difficulty-keyed category is resolved before the first draw,
    /// so a rule table that lacks `difficulty` leaves `rng` untouched.
    pub fn generate_from(
        &self,
        difficulty: &Difficulty,
        rng: &mut StdRng,
    ) -> Result<Challenge, ChallengeError> {
        let resolved = self.rules.difficulty(difficulty)?;
        let empty = |category: &'static str| RuleError::EmptyCategory {
            category,
            difficulty: difficulty.to_string(),
        };

        let (location, location_cost) = resolved
            .start_locations
            .iter()
            .choose(rng)
            .ok_or_else(|| empty("start_locations"))?;
        let (profession, profession_cost) = resolved
            .professions
            .iter()
            .choose(rng)
            .ok_or_else(|| empty("professions"))?;
        let mission = resolved
            .missions
            .choose(rng)
            .ok_or_else(|| empty("missions"))?;
        let settings = resolved
            .settings
            .choose(rng)
            .ok_or_else(|| empty("settings"))?;

        let start_value = *profession_cost;
        let target_value = resolved.end_trait_value + location_cost + self.config.target_offset;

        let mut allocator = Allocator::new(&self.rules, self.config);
        if difficulty.is_ungated() {
            allocator = allocator.without_tolerance_gate();
        }
        let allocation = allocator.allocate(
            start_value,
            target_value,
            resolved.min_traits,
            self.config.tolerance_seed,
            rng,
        )?;

        info!(
            %difficulty,
            location = location.as_str(),
            profession = profession.as_str(),
            target_value,
            final_value = allocation.final_value,
            succeeded = allocation.succeeded,
            "generated challenge"
        );

        Ok(Challenge {
            difficulty: difficulty.clone(),
            location: location.clone(),
            profession: profession.clone(),
            mission: mission.clone(),
            settings: settings.clone(),
            positive_traits: allocation.positive_traits,
            negative_traits: allocation.negative_traits,
            target_value,
            final_value: allocation.final_value,
            succeeded: allocation.succeeded,
        })
    }
}

impl ChallengeGeneratorBuilder {
    pub fn rules_path(mut self, path: impl AsRef<Path>) -> Self {
        self.rules_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Provide rules directly (for testing without files).
    pub fn with_rules(mut self, rules: RuleTable) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn config(mut self, config: AllocatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn build(self) -> Result<ChallengeGenerator, ChallengeError> {
        let rules = match (self.rules, self.rules_path) {
            (Some(rules), _) => rules,
            (None, Some(path)) => RuleTable::load_from_ron(&path)?,
            (None, None) => return Err(ChallengeError::MissingRules),
        };

        Ok(ChallengeGenerator {
            rules,
            config: self.config,
            max_attempts: self.max_attempts,
            seed: self.seed,
            generation_count: 0,
        })
    }
}
