/// Trait budget allocator: converges a running value on a target by
/// drawing random traits under exclusion and tolerance constraints.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::finisher;
use crate::core::rules::RuleTable;
use crate::schema::trait_kind::TraitKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("residual {0} is outside the range the finisher maps")]
    ResidualOutOfRange(i32),
}

/// Tunables for one allocation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// `|target - running|` at or below which the finisher may close the gap.
    pub end_band: i32,
    /// Starting tolerance threshold.
    pub tolerance_seed: i32,
    /// The threshold is never halved below this.
    pub tolerance_floor: i32,
    /// Rejected candidates allowed before the run fails.
    pub retry_budget: u32,
    /// Added to the difficulty target by the challenge generator.
    pub target_offset: i32,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            end_band: finisher::MAX_RESIDUAL,
            tolerance_seed: 20,
            tolerance_floor: 4,
            retry_budget: 25,
            target_offset: 0,
        }
    }
}

/// Source of candidate draws. Returns an index into `pool`, or `None` when
/// there is nothing to draw.
pub trait TraitPicker {
    fn pick(&mut self, pool: &[String]) -> Option<usize>;
}

impl TraitPicker for StdRng {
    fn pick(&mut self, pool: &[String]) -> Option<usize> {
        if pool.is_empty() {
            return None;
        }
        Some(self.gen_range(0..pool.len()))
    }
}

/// Replays a fixed sequence of trait names. A name missing from the pool
/// being drawn, or an exhausted script, yields no candidate.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPicker {
    script: VecDeque<String>,
}

impl ScriptedPicker {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl TraitPicker for ScriptedPicker {
    fn pick(&mut self, pool: &[String]) -> Option<usize> {
        let name = self.script.pop_front()?;
        pool.iter().position(|candidate| *candidate == name)
    }
}

/// Why a candidate was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rejection {
    NoCandidate,
    AlreadySelected,
    Excluded,
    ToleranceGate,
    /// Accepting the candidate would take the running value out of `i32`.
    OutOfRange,
}

/// Outcome of a single allocator iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Accepted {
        name: String,
        kind: TraitKind,
        cost: i32,
    },
    Rejected(Rejection),
    /// Converged; any filler has been appended.
    Finished,
    /// The retry budget ran out.
    Exhausted,
}

impl Step {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Exhausted)
    }
}

/// Final record of an allocation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub positive_traits: Vec<String>,
    pub negative_traits: Vec<String>,
    pub succeeded: bool,
    pub final_value: i32,
    pub final_tolerance: i32,
    pub rejections: u32,
}

/// A draw pool: names and costs in catalog order.
#[derive(Debug, Clone, Default)]
struct Pool {
    names: Vec<String>,
    costs: Vec<i32>,
}

/// Draws traits from a [`RuleTable`].
///
/// Finisher fillers never enter the draw pools, and neither does any trait
/// mutually exclusive with a filler, so appending a filler can never create
/// an excluded pair.
pub struct Allocator<'r> {
    rules: &'r RuleTable,
    config: AllocatorConfig,
    gated: bool,
    positive: Pool,
    negative: Pool,
}

impl<'r> Allocator<'r> {
    pub fn new(rules: &'r RuleTable, config: AllocatorConfig) -> Self {
        Self {
            rules,
            config,
            gated: true,
            positive: Self::build_pool(rules, TraitKind::Positive),
            negative: Self::build_pool(rules, TraitKind::Negative),
        }
    }

    /// Accept candidates regardless of the tolerance threshold.
    pub fn without_tolerance_gate(mut self) -> Self {
        self.gated = false;
        self
    }

    fn build_pool(rules: &RuleTable, kind: TraitKind) -> Pool {
        let mut pool = Pool::default();
        for (name, cost) in rules.traits(kind) {
            if finisher::is_filler(name) {
                continue;
            }
            if rules.excluded_by(name).any(finisher::is_filler) {
                debug!(name, "left out of draw pool: excluded by a filler");
                continue;
            }
            pool.names.push(name.to_string());
            pool.costs.push(cost);
        }
        pool
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Names that can be drawn from one pool.
    pub fn pool(&self, kind: TraitKind) -> &[String] {
        match kind {
            TraitKind::Positive => &self.positive.names,
            TraitKind::Negative => &self.negative.names,
        }
    }

    fn pool_entry(&self, kind: TraitKind, index: usize) -> Option<(&str, i32)> {
        let pool = match kind {
            TraitKind::Positive => &self.positive,
            TraitKind::Negative => &self.negative,
        };
        Some((pool.names.get(index)?.as_str(), *pool.costs.get(index)?))
    }

    /// Start a run without stepping it.
    ///
    /// `tolerance_seed` is the run's starting threshold and takes precedence
    /// over `AllocatorConfig::tolerance_seed`, which only supplies the value
    /// callers such as the challenge generator pass in.
    pub fn begin(
        &self,
        start_value: i32,
        target_value: i32,
        min_trait_count: u32,
        tolerance_seed: i32,
    ) -> AllocationState {
        AllocationState {
            running_value: start_value,
            target_value,
            selected_positive: Vec::new(),
            selected_negative: Vec::new(),
            min_remaining_picks: i64::from(min_trait_count),
            tolerance_threshold: tolerance_seed,
            retry_budget: self.config.retry_budget,
            rejections: 0,
            outcome: None,
        }
    }

    /// Run an allocation to completion.
    ///
    /// Exhausting the retry budget is reported through
    /// `AllocationResult::succeeded`, not as an error. See [`Allocator::begin`]
    /// for how `tolerance_seed` relates to the config.
    pub fn allocate<P: TraitPicker + ?Sized>(
        &self,
        start_value: i32,
        target_value: i32,
        min_trait_count: u32,
        tolerance_seed: i32,
        picker: &mut P,
    ) -> Result<AllocationResult, AllocationError> {
        let mut state = self.begin(start_value, target_value, min_trait_count, tolerance_seed);
        while !state.step(self, picker)?.is_terminal() {}
        Ok(state.into_result())
    }
}

/// Mutable state of one allocation run.
#[derive(Debug, Clone)]
pub struct AllocationState {
    running_value: i32,
    target_value: i32,
    selected_positive: Vec<String>,
    selected_negative: Vec<String>,
    min_remaining_picks: i64,
    tolerance_threshold: i32,
    retry_budget: u32,
    rejections: u32,
    /// `Some(succeeded)` once the run has terminated.
    outcome: Option<bool>,
}

impl AllocationState {
    pub fn running_value(&self) -> i32 {
        self.running_value
    }

    pub fn target_value(&self) -> i32 {
        self.target_value
    }

    pub fn selected_positive(&self) -> &[String] {
        &self.selected_positive
    }

    pub fn selected_negative(&self) -> &[String] {
        &self.selected_negative
    }

    pub fn min_remaining_picks(&self) -> i64 {
        self.min_remaining_picks
    }

    pub fn tolerance_threshold(&self) -> i32 {
        self.tolerance_threshold
    }

    pub fn retry_budget(&self) -> u32 {
        self.retry_budget
    }

    /// `Some(true)` after convergence, `Some(false)` after exhaustion.
    pub fn outcome(&self) -> Option<bool> {
        self.outcome
    }

    fn selected(&self) -> impl Iterator<Item = &str> {
        self.selected_positive
            .iter()
            .chain(self.selected_negative.iter())
            .map(String::as_str)
    }

    /// Advance the run by one iteration.
    ///
    /// Stepping a terminated run returns its terminal step again without
    /// changing anything.
    pub fn step<P: TraitPicker + ?Sized>(
        &mut self,
        allocator: &Allocator<'_>,
        picker: &mut P,
    ) -> Result<Step, AllocationError> {
        match self.outcome {
            Some(true) => return Ok(Step::Finished),
            Some(false) => return Ok(Step::Exhausted),
            None => {}
        }

        if self.running_value == self.target_value && self.min_remaining_picks <= 0 {
            self.outcome = Some(true);
            return Ok(Step::Finished);
        }

        // A gap too wide for `i32` is never in band.
        let residual = self
            .target_value
            .checked_sub(self.running_value)
            .filter(|r| i64::from(r.unsigned_abs()) <= i64::from(allocator.config.end_band));
        if let Some(residual) = residual.filter(|_| self.min_remaining_picks <= 0) {
            for filler in finisher::resolve(residual)? {
                self.selected_positive.push(filler.name.to_string());
                // Fillers share the residual's sign, so this stays between
                // the running value and the target.
                self.running_value = self.running_value.saturating_add(filler.cost);
            }
            self.outcome = Some(true);
            return Ok(Step::Finished);
        }

        let kind = TraitKind::toward(self.running_value, self.target_value);
        let candidate = picker
            .pick(allocator.pool(kind))
            .and_then(|index| allocator.pool_entry(kind, index));

        let verdict = match candidate {
            Some((name, cost)) => self
                .evaluate(allocator, kind, name, cost)
                .map(|next| (name, cost, next)),
            None => Err(Rejection::NoCandidate),
        };

        match verdict {
            Ok((name, cost, next)) => {
                self.running_value = next;
                match kind {
                    TraitKind::Positive => self.selected_positive.push(name.to_string()),
                    TraitKind::Negative => self.selected_negative.push(name.to_string()),
                }
                self.min_remaining_picks -= 1;
                Ok(Step::Accepted {
                    name: name.to_string(),
                    kind,
                    cost,
                })
            }
            Err(rejection) => {
                self.rejections += 1;
                self.retry_budget = self.retry_budget.saturating_sub(1);
                debug!(
                    ?rejection,
                    pool = kind.label(),
                    remaining = self.retry_budget,
                    "candidate rejected"
                );
                if self.retry_budget == 0 {
                    self.outcome = Some(false);
                    warn!(
                        running = self.running_value,
                        target = self.target_value,
                        rejections = self.rejections,
                        "allocation exhausted its retry budget"
                    );
                    return Ok(Step::Exhausted);
                }
                Ok(Step::Rejected(rejection))
            }
        }
    }

    fn evaluate(
        &mut self,
        allocator: &Allocator<'_>,
        kind: TraitKind,
        name: &str,
        cost: i32,
    ) -> Result<i32, Rejection> {
        let own = match kind {
            TraitKind::Positive => &self.selected_positive,
            TraitKind::Negative => &self.selected_negative,
        };
        if own.iter().any(|s| s == name) {
            return Err(Rejection::AlreadySelected);
        }

        if allocator.rules.conflicts_with(name, self.selected()) {
            return Err(Rejection::Excluded);
        }

        if allocator.gated && i64::from(cost).abs() > i64::from(self.tolerance_threshold) {
            return Err(Rejection::ToleranceGate);
        }

        let next = self
            .running_value
            .checked_add(cost)
            .ok_or(Rejection::OutOfRange)?;
        if !allocator.gated {
            return Ok(next);
        }

        // Positive passes narrow twice, negative passes once.
        let halvings = match kind {
            TraitKind::Positive => 2,
            TraitKind::Negative => 1,
        };
        for _ in 0..halvings {
            let halved = self.tolerance_threshold / 2;
            if halved < allocator.config.tolerance_floor {
                break;
            }
            debug!(from = self.tolerance_threshold, to = halved, "tolerance narrowed");
            self.tolerance_threshold = halved;
        }
        Ok(next)
    }

    /// Convert a run into its result record.
    pub fn into_result(self) -> AllocationResult {
        AllocationResult {
            positive_traits: self.selected_positive,
            negative_traits: self.selected_negative,
            succeeded: self.outcome == Some(true),
            final_value: self.running_value,
            final_tolerance: self.tolerance_threshold,
            rejections: self.rejections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const RULES: &str = r#"(
        positive_traits: {
            "Athletic": -10,
            "Brave": -4,
            "Dextrous": -2,
            "Fast Reader": -2,
            "Graceful": -2,
            "Lucky": -4,
            "Strong": -10,
        },
        negative_traits: {
            "Clumsy": 2,
            "Pacifist": 4,
            "Short Sighted": 2,
            "Slow Reader": 2,
            "Smoker": 4,
            "Unlucky": 4,
            "Weak": 10,
        },
        exclusions: {
            "Strong": ["Weak"],
            "Lucky": ["Unlucky"],
            "Fast Reader": ["Slow Reader"],
            "Graceful": ["Clumsy"],
        },
        end_trait_value: {"Easy": 0},
        min_traits: {"Easy": 1},
        start_locations: {"Easy": {"Riverside": 0}},
        professions: {"Easy": {"Veteran": -8}},
        missions: {"Easy": ["Survive"]},
        settings: {"Easy": ["Builder"]},
    )"#;

    fn rules() -> RuleTable {
        RuleTable::parse_ron(RULES).unwrap()
    }

    fn run(
        allocator: &Allocator<'_>,
        start: i32,
        target: i32,
        min: u32,
        seed: i32,
        script: &[&str],
    ) -> AllocationResult {
        let mut picker = ScriptedPicker::new(script.iter().copied());
        allocator
            .allocate(start, target, min, seed, &mut picker)
            .unwrap()
    }

    #[test]
    fn pools_leave_out_fillers_and_their_exclusions() {
        let rules = rules();
        let allocator = Allocator::new(&rules, AllocatorConfig::default());
        assert!(!allocator.pool(TraitKind::Positive).contains(&"Graceful".to_string()));
        assert!(!allocator.pool(TraitKind::Negative).contains(&"Clumsy".to_string()));
        assert_eq!(allocator.pool(TraitKind::Positive).len(), 6);
        assert_eq!(allocator.pool(TraitKind::Negative).len(), 6);
    }

    #[test]
    fn already_at_target_finishes_without_drawing() {
        let rules = rules();
        let allocator = Allocator::new(&rules, AllocatorConfig::default());
        let result = run(&allocator, 2, 2, 0, 20, &[]);
        assert!(result.succeeded);
        assert!(result.positive_traits.is_empty());
        assert!(result.negative_traits.is_empty());
        assert_eq!(result.rejections, 0);
        assert_eq!(result.final_value, 2);
    }

    #[test]
    fn one_positive_trait_reaches_lower_target() {
        let rules = rules();
        let allocator = Allocator::new(&rules, AllocatorConfig::default());
        let result = run(&allocator, 0, -2, 1, 20, &["Dextrous"]);
        assert!(result.succeeded);
        assert_eq!(result.positive_traits, vec!["Dextrous"]);
        assert!(result.negative_traits.is_empty());
        assert_eq!(result.final_value, -2);
    }

    #[test]
    fn one_negative_trait_reaches_higher_target() {
        let rules = rules();
        let allocator = Allocator::new(&rules, AllocatorConfig::default());
        let result = run(&allocator, 0, 2, 1, 20, &["Slow Reader"]);
        assert!(result.succeeded);
        assert_eq!(result.negative_traits, vec!["Slow Reader"]);
        assert!(result.positive_traits.is_empty());
    }

    #[test]
    fn residual_of_one_appends_sunday_driver() {
        let rules = rules();
        let allocator = Allocator::new(&rules, AllocatorConfig::default());
        let result = run(&allocator, 0, 5, 1, 20, &["Smoker"]);
        assert!(result.succeeded);
        assert_eq!(result.negative_traits, vec!["Smoker"]);
        assert_eq!(result.positive_traits, vec!["Sunday Driver"]);
        assert_eq!(result.final_value, 5);
    }

    #[test]
    fn residual_of_minus_three_appends_two_fillers() {
        let rules = rules();
        let allocator = Allocator::new(&rules, AllocatorConfig::default());
        let result = run(&allocator, 0, -7, 1, 20, &["Brave"]);
        assert!(result.succeeded);
        assert_eq!(
            result.positive_traits,
            vec!["Brave", "Speed Demon", "Graceful"]
        );
        assert_eq!(result.final_value, -7);
    }

    #[test]
    fn duplicate_draw_is_rejected() {
        let rules = rules();
        let allocator = Allocator::new(&rules, AllocatorConfig::default());
        let mut state = allocator.begin(0, -8, 2, 20);
        let mut picker = ScriptedPicker::new(["Brave", "Brave", "Lucky"]);

        assert!(matches!(
            state.step(&allocator, &mut picker).unwrap(),
            Step::Accepted { ref name, kind: TraitKind::Positive, cost: -4 } if name == "Brave"
        ));
        assert_eq!(
            state.step(&allocator, &mut picker).unwrap(),
            Step::Rejected(Rejection::AlreadySelected)
        );
        assert_eq!(state.retry_budget(), 24);
        assert!(matches!(
            state.step(&allocator, &mut picker).unwrap(),
            Step::Accepted { .. }
        ));
        assert_eq!(state.step(&allocator, &mut picker).unwrap(), Step::Finished);

        let result = state.into_result();
        assert_eq!(result.positive_traits, vec!["Brave", "Lucky"]);
        assert_eq!(result.rejections, 1);
    }

    #[test]
    fn tie_with_picks_remaining_draws_positive_and_honours_exclusion() {
        let rules = rules();
        let allocator = Allocator::new(&rules, AllocatorConfig::default());
        let mut state = allocator.begin(0, 4, 2, 20);
        let mut picker = ScriptedPicker::new(["Unlucky", "Lucky", "Dextrous"]);

        assert!(matches!(
            state.step(&allocator, &mut picker).unwrap(),
            Step::Accepted { kind: TraitKind::Negative, .. }
        ));
        // Running value now equals the target with one pick outstanding:
        // the positive pool is drawn even though that overshoots.
        assert_eq!(state.running_value(), state.target_value());
        assert_eq!(
            state.step(&allocator, &mut picker).unwrap(),
            Step::Rejected(Rejection::Excluded)
        );
        assert!(matches!(
            state.step(&allocator, &mut picker).unwrap(),
            Step::Accepted { kind: TraitKind::Positive, cost: -2, .. }
        ));
        assert_eq!(state.step(&allocator, &mut picker).unwrap(), Step::Finished);

        let result = state.into_result();
        assert_eq!(result.negative_traits, vec!["Unlucky"]);
        assert_eq!(result.positive_traits, vec!["Dextrous", "Cowardly"]);
        assert_eq!(result.final_value, 4);
    }

    #[test]
    fn tolerance_gate_rejects_large_costs() {
        let rules = rules();
        let allocator = Allocator::new(&rules, AllocatorConfig::default());
        let mut state = allocator.begin(0, 12, 1, 5);
        let mut picker = ScriptedPicker::new(["Weak", "Smoker", "Pacifist", "Slow Reader"]);

        assert_eq!(
            state.step(&allocator, &mut picker).unwrap(),
            Step::Rejected(Rejection::ToleranceGate)
        );
        while !state.step(&allocator, &mut picker).unwrap().is_terminal() {}

        let result = state.into_result();
        assert!(result.succeeded);
        assert_eq!(result.negative_traits, vec!["Smoker", "Pacifist", "Slow Reader"]);
        assert_eq!(result.positive_traits, vec!["Cowardly"]);
        assert_eq!(result.final_tolerance, 5);
    }

    #[test]
    fn ungated_allocation_accepts_large_costs() {
        let rules = rules();
        let allocator =
            Allocator::new(&rules, AllocatorConfig::default()).without_tolerance_gate();
        let result = run(&allocator, 0, 12, 1, 5, &["Weak"]);
        assert!(result.succeeded);
        assert_eq!(result.negative_traits, vec!["Weak"]);
        assert_eq!(result.positive_traits, vec!["Cowardly"]);
        assert_eq!(result.rejections, 0);
        assert_eq!(result.final_tolerance, 5);
    }

    #[test]
    fn positive_pass_halves_twice_negative_once() {
        let rules = rules();
        let allocator = Allocator::new(&rules, AllocatorConfig::default());

        let mut negative = allocator.begin(0, 20, 3, 20);
        let mut picker = ScriptedPicker::new(["Smoker"]);
        negative.step(&allocator, &mut picker).unwrap();
        assert_eq!(negative.tolerance_threshold(), 10);

        let mut positive = allocator.begin(0, -20, 3, 20);
        let mut picker = ScriptedPicker::new(["Brave"]);
        positive.step(&allocator, &mut picker).unwrap();
        assert_eq!(positive.tolerance_threshold(), 5);
    }

    #[test]
    fn tolerance_never_halves_below_floor() {
        let rules = rules();
        let allocator = Allocator::new(&rules, AllocatorConfig::default());
        let mut state = allocator.begin(0, 20, 4, 7);
        let mut picker = ScriptedPicker::new(["Smoker", "Pacifist", "Slow Reader"]);
        for _ in 0..3 {
            state.step(&allocator, &mut picker).unwrap();
            assert!(state.tolerance_threshold() >= allocator.config().tolerance_floor);
        }
        assert_eq!(state.tolerance_threshold(), 7);
    }

    #[test]
    fn exhausted_budget_fails_the_run() {
        let rules = rules();
        let config = AllocatorConfig {
            retry_budget: 3,
            ..AllocatorConfig::default()
        };
        let allocator = Allocator::new(&rules, config);
        let result = run(&allocator, 0, 12, 1, 5, &["Weak", "Weak", "Weak", "Smoker"]);
        assert!(!result.succeeded);
        assert_eq!(result.rejections, 3);
        assert!(result.negative_traits.is_empty());
        assert_eq!(result.final_value, 0);
    }

    #[test]
    fn gap_wider_than_i32_exhausts_instead_of_overflowing() {
        let rules = rules();
        let allocator = Allocator::new(&rules, AllocatorConfig::default());
        let result = allocator
            .allocate(i32::MAX, i32::MIN, 0, 20, &mut ScriptedPicker::default())
            .unwrap();
        assert!(!result.succeeded);
        assert_eq!(result.rejections, 25);
        assert_eq!(result.final_value, i32::MAX);

        let result = allocator
            .allocate(i32::MIN, i32::MAX, 0, 20, &mut ScriptedPicker::default())
            .unwrap();
        assert!(!result.succeeded);
        assert_eq!(result.final_value, i32::MIN);
    }

    #[test]
    fn candidate_past_i32_max_is_rejected() {
        let rules = rules();
        let allocator = Allocator::new(&rules, AllocatorConfig::default());
        let mut state = allocator.begin(i32::MAX - 3, i32::MAX, 1, 20);
        let mut picker = ScriptedPicker::new(["Smoker", "Slow Reader"]);

        assert_eq!(
            state.step(&allocator, &mut picker).unwrap(),
            Step::Rejected(Rejection::OutOfRange)
        );
        assert_eq!(state.tolerance_threshold(), 20);
        assert!(matches!(
            state.step(&allocator, &mut picker).unwrap(),
            Step::Accepted { cost: 2, .. }
        ));
        assert_eq!(state.step(&allocator, &mut picker).unwrap(), Step::Finished);

        let result = state.into_result();
        assert!(result.succeeded);
        assert_eq!(result.negative_traits, vec!["Slow Reader"]);
        assert_eq!(result.positive_traits, vec!["Sunday Driver"]);
        assert_eq!(result.final_value, i32::MAX);
    }

    #[test]
    fn ungated_candidate_past_i32_min_is_rejected() {
        let rules = rules();
        let allocator =
            Allocator::new(&rules, AllocatorConfig::default()).without_tolerance_gate();
        let mut state = allocator.begin(i32::MIN + 5, i32::MIN, 1, 20);
        let mut picker = ScriptedPicker::new(["Athletic"]);
        assert_eq!(
            state.step(&allocator, &mut picker).unwrap(),
            Step::Rejected(Rejection::OutOfRange)
        );
        assert_eq!(state.running_value(), i32::MIN + 5);
    }

    #[test]
    fn tolerance_seed_argument_overrides_config() {
        let rules = rules();
        let config = AllocatorConfig {
            tolerance_seed: 2,
            ..AllocatorConfig::default()
        };
        let allocator = Allocator::new(&rules, config);
        let result = run(&allocator, 0, 12, 1, 20, &["Weak"]);
        assert!(result.succeeded);
        assert_eq!(result.negative_traits, vec!["Weak"]);
        assert_eq!(result.final_tolerance, 10);
    }

    #[test]
    fn exhaustion_stops_even_next_to_target() {
        let rules = rules();
        let config = AllocatorConfig {
            retry_budget: 2,
            ..AllocatorConfig::default()
        };
        let allocator = Allocator::new(&rules, config);
        // One short of the target, but two picks are still owed and the
        // script offers nothing usable.
        let result = run(&allocator, 0, 1, 2, 20, &[]);
        assert!(!result.succeeded);
        assert_eq!(result.rejections, 2);
    }

    #[test]
    fn terminated_run_is_sticky() {
        let rules = rules();
        let allocator = Allocator::new(&rules, AllocatorConfig::default());
        let mut state = allocator.begin(3, 3, 0, 20);
        let mut picker = ScriptedPicker::new(["Brave"]);
        assert_eq!(state.step(&allocator, &mut picker).unwrap(), Step::Finished);
        assert_eq!(state.step(&allocator, &mut picker).unwrap(), Step::Finished);
        assert_eq!(picker.remaining(), 1);
        assert_eq!(state.outcome(), Some(true));
    }

    #[test]
    fn band_wider_than_finisher_fails_loudly() {
        let rules = rules();
        let config = AllocatorConfig {
            end_band: 5,
            ..AllocatorConfig::default()
        };
        let allocator = Allocator::new(&rules, config);
        let mut picker = ScriptedPicker::default();
        assert_eq!(
            allocator.allocate(0, 4, 0, 20, &mut picker),
            Err(AllocationError::ResidualOutOfRange(4))
        );
    }

    #[test]
    fn seeded_rng_is_deterministic() {
        let rules = rules();
        let allocator = Allocator::new(&rules, AllocatorConfig::default());
        let mut rng1 = StdRng::seed_from_u64(42);
        let mut rng2 = StdRng::seed_from_u64(42);
        let a = allocator.allocate(-8, 6, 3, 20, &mut rng1).unwrap();
        let b = allocator.allocate(-8, 6, 3, 20, &mut rng2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn std_rng_picks_within_pool() {
        let mut rng = StdRng::seed_from_u64(7);
        let pool: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        for _ in 0..100 {
            let index = rng.pick(&pool).unwrap();
            assert!(index < pool.len());
        }
        assert_eq!(rng.pick(&[]), None);
    }
}
