/// Stream challenge session: a five-stage choice flow spending one shared
/// point pool.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::core::rules::{RuleTable, StreamRules};
use crate::schema::stage::{Stage, StageOption, StageResult, StreamChallenge};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session is no longer accepting choices ({0:?})")]
    Closed(SessionState),
    #[error("expected a choice for {expected:?}, got {got:?}")]
    OutOfOrder { expected: Stage, got: Stage },
    #[error("no options chosen for {0:?}")]
    EmptyChoice(Stage),
    #[error("{stage:?} takes exactly one choice, got {count}")]
    TooManyChoices { stage: Stage, count: usize },
    #[error("'{name}' is not an option for {stage:?}")]
    UnknownOption { stage: Stage, name: String },
    #[error("'{0}' was already chosen")]
    DuplicateChoice(String),
    #[error("'{name}' cannot be combined with '{conflict}'")]
    Excluded { name: String, conflict: String },
    #[error("point total for {0:?} does not fit in the pool's range")]
    PointOverflow(Stage),
}

/// Where a session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Awaiting(Stage),
    Complete,
    /// A commit overdrew the point pool. Terminal.
    Invalid,
}

/// What a commit reports back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitOutcome {
    pub remaining_points: i32,
    pub valid: bool,
}

/// One interactive stream challenge.
///
/// Each stage offers only what the remaining points can pay for. Trait
/// batches also hide anything mutually exclusive with an earlier pick.
/// Overdrawing the pool is an ordinary outcome: the session turns
/// [`SessionState::Invalid`] and offers nothing further.
#[derive(Debug, Clone)]
pub struct StreamSession<'r> {
    rules: &'r RuleTable,
    stream: &'r StreamRules,
    total_points: i32,
    remaining_points: i32,
    committed: Vec<StageResult>,
    state: SessionState,
}

impl<'r> StreamSession<'r> {
    /// Begin a session with the stream rules' configured point pool.
    pub fn begin(rules: &'r RuleTable, stream: &'r StreamRules) -> Self {
        Self::with_points(rules, stream, stream.total_points())
    }

    /// Begin a session with an explicit point pool.
    pub fn with_points(rules: &'r RuleTable, stream: &'r StreamRules, total_points: i32) -> Self {
        Self {
            rules,
            stream,
            total_points,
            remaining_points: total_points,
            committed: Vec::new(),
            state: SessionState::Awaiting(Stage::Location),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn total_points(&self) -> i32 {
        self.total_points
    }

    pub fn remaining_points(&self) -> i32 {
        self.remaining_points
    }

    pub fn committed(&self) -> &[StageResult] {
        &self.committed
    }

    /// Points spent beyond the pool, once the session is invalid.
    pub fn overdraft(&self) -> Option<u32> {
        (self.remaining_points < 0).then(|| self.remaining_points.unsigned_abs())
    }

    fn committed_traits(&self) -> impl Iterator<Item = &str> {
        let skip = self.stream.skip_option();
        self.committed
            .iter()
            .filter(|r| r.stage.is_trait_batch())
            .flat_map(|r| r.choices.iter().map(String::as_str))
            .filter(move |name| *name != skip)
    }

    fn choices_for(&self, stage: Stage) -> impl Iterator<Item = &String> {
        self.committed
            .iter()
            .filter(move |r| r.stage == stage)
            .flat_map(|r| r.choices.iter())
    }

    /// Options for `stage`, cheapest first.
    ///
    /// Empty unless `stage` is the one the session is waiting on.
    pub fn offer_options(&self, stage: Stage) -> Vec<StageOption> {
        if self.state != SessionState::Awaiting(stage) {
            return Vec::new();
        }

        let skip = self.stream.skip_option();
        let taken: Vec<&str> = self.committed_traits().collect();
        let mut options: Vec<StageOption> = self
            .stream
            .catalog(stage)
            .into_iter()
            .filter(|(_, cost)| *cost <= self.remaining_points)
            .filter(|(name, _)| {
                !stage.is_trait_batch()
                    || *name == skip
                    || (!taken.contains(name)
                        && !self.rules.conflicts_with(name, taken.iter().copied()))
            })
            .map(|(name, cost)| StageOption {
                name: name.to_string(),
                cost,
            })
            .collect();
        options.sort_by(|a, b| a.cost.cmp(&b.cost).then_with(|| a.name.cmp(&b.name)));
        options
    }

    /// Commit the choices for `stage` and advance.
    ///
    /// Choices are validated against the stage's full catalog, not the
    /// offered subset: an unaffordable pick is accepted and overdraws the
    /// pool.
    pub fn commit<S: AsRef<str>>(
        &mut self,
        stage: Stage,
        chosen: &[S],
    ) -> Result<CommitOutcome, SessionError> {
        let expected = match self.state {
            SessionState::Awaiting(expected) => expected,
            closed => return Err(SessionError::Closed(closed)),
        };
        if stage != expected {
            return Err(SessionError::OutOfOrder {
                expected,
                got: stage,
            });
        }
        if chosen.is_empty() {
            return Err(SessionError::EmptyChoice(stage));
        }
        if stage == Stage::Location && chosen.len() > 1 {
            return Err(SessionError::TooManyChoices {
                stage,
                count: chosen.len(),
            });
        }

        let mut cost: i32 = 0;
        let mut choices: Vec<String> = Vec::with_capacity(chosen.len());
        for name in chosen.iter().map(AsRef::as_ref) {
            let option_cost =
                self.stream
                    .option_cost(stage, name)
                    .ok_or_else(|| SessionError::UnknownOption {
                        stage,
                        name: name.to_string(),
                    })?;
            if choices.iter().any(|c| c == name) {
                return Err(SessionError::DuplicateChoice(name.to_string()));
            }
            if stage.is_trait_batch() && name != self.stream.skip_option() {
                self.check_exclusion(name, &choices)?;
            }
            cost = cost
                .checked_add(option_cost)
                .ok_or(SessionError::PointOverflow(stage))?;
            choices.push(name.to_string());
        }

        self.remaining_points = self
            .remaining_points
            .checked_sub(cost)
            .ok_or(SessionError::PointOverflow(stage))?;
        self.committed.push(StageResult {
            stage,
            choices,
            cost,
        });

        if self.remaining_points < 0 {
            self.state = SessionState::Invalid;
            warn!(
                ?stage,
                overdraft = self.remaining_points.unsigned_abs(),
                "stream session overdrew its points"
            );
        } else {
            self.state = match stage.next() {
                Some(next) => SessionState::Awaiting(next),
                None => SessionState::Complete,
            };
            info!(?stage, cost, remaining = self.remaining_points, "stage committed");
        }

        Ok(CommitOutcome {
            remaining_points: self.remaining_points,
            valid: self.state != SessionState::Invalid,
        })
    }

    fn check_exclusion(&self, name: &str, pending: &[String]) -> Result<(), SessionError> {
        if self.committed_traits().any(|t| t == name) {
            return Err(SessionError::DuplicateChoice(name.to_string()));
        }
        let earlier = self
            .committed_traits()
            .chain(pending.iter().map(String::as_str));
        for other in earlier {
            if self.rules.are_exclusive(name, other) {
                return Err(SessionError::Excluded {
                    name: name.to_string(),
                    conflict: other.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Summarise the session. `valid` only once every stage is committed
    /// within budget.
    pub fn summary(&self) -> StreamChallenge {
        StreamChallenge {
            location: self.choices_for(Stage::Location).next().cloned(),
            negative_traits: self.committed_traits().map(str::to_string).collect(),
            missions: self.choices_for(Stage::Mission).cloned().collect(),
            remaining_points: self.remaining_points,
            valid: self.state == SessionState::Complete,
        }
    }
}
