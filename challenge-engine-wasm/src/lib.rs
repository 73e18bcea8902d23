//! WASM bindings for challenge-engine, for browser hosts.

use std::sync::OnceLock;
use wasm_bindgen::prelude::*;

use challenge_engine::core::generator::ChallengeGenerator;
use challenge_engine::core::rules::{RuleTable, StreamRules};
use challenge_engine::core::session::{SessionState, StreamSession};
use challenge_engine::schema::challenge::Difficulty;
use challenge_engine::schema::stage::Stage;

// ---------------------------------------------------------------------------
// Embedded rule data, compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const SURVIVAL_RULES: &str = include_str!("../../rule_data/survival/rules.ron");
    pub const SURVIVAL_STREAM: &str = include_str!("../../rule_data/survival/stream.ron");
}

struct Bundled {
    rules: RuleTable,
    stream: StreamRules,
}

static BUNDLED: OnceLock<Bundled> = OnceLock::new();

fn bundled() -> Result<&'static Bundled, JsError> {
    if let Some(bundled) = BUNDLED.get() {
        return Ok(bundled);
    }
    let rules = RuleTable::parse_ron(data::SURVIVAL_RULES)
        .map_err(|e| JsError::new(&format!("Rule parse error: {e}")))?;
    let stream = StreamRules::parse_ron(data::SURVIVAL_STREAM, &rules)
        .map_err(|e| JsError::new(&format!("Stream rule parse error: {e}")))?;
    Ok(BUNDLED.get_or_init(|| Bundled { rules, stream }))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&format!("JSON error: {e}")))
}

fn parse_stage(id: &str) -> Result<Stage, JsError> {
    Stage::parse(id).ok_or_else(|| JsError::new(&format!("Unknown stage: {id}")))
}

fn random_seed() -> Result<u64, JsError> {
    let mut buf = [0u8; 8];
    getrandom::getrandom(&mut buf).map_err(|e| JsError::new(&format!("Entropy error: {e}")))?;
    Ok(u64::from_le_bytes(buf))
}

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
struct CommitInfo {
    remaining_points: i32,
    valid: bool,
    next_stage: Option<Stage>,
    overdraft: Option<u32>,
}

/// Generate one challenge from the bundled survival rules. Returns the
/// challenge as JSON. Pass no seed for an unseeded draw.
#[wasm_bindgen]
pub fn generate_challenge(difficulty: &str, seed: Option<u64>) -> Result<String, JsError> {
    let bundled = bundled()?;
    let seed = match seed {
        Some(seed) => seed,
        None => random_seed()?,
    };
    let mut generator = ChallengeGenerator::builder()
        .with_rules(bundled.rules.clone())
        .seed(seed)
        .build()
        .map_err(|e| JsError::new(&format!("Generator build error: {e}")))?;
    let challenge = generator
        .generate(&Difficulty::new(difficulty))
        .map_err(|e| JsError::new(&format!("Generation error: {e}")))?;
    to_json(&challenge)
}

/// Difficulties the bundled rules define, as a JSON array.
#[wasm_bindgen]
pub fn difficulties() -> Result<String, JsError> {
    let names: Vec<Difficulty> = bundled()?.rules.difficulties().collect();
    to_json(&names)
}

// ---------------------------------------------------------------------------
// StreamSessionHandle: one interactive stream challenge
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct StreamSessionHandle {
    session: StreamSession<'static>,
}

#[wasm_bindgen]
impl StreamSessionHandle {
    /// Start a session. Pass no points to use the bundled pool.
    #[wasm_bindgen(constructor)]
    pub fn new(total_points: Option<i32>) -> Result<StreamSessionHandle, JsError> {
        let bundled = bundled()?;
        let session = match total_points {
            Some(points) => StreamSession::with_points(&bundled.rules, &bundled.stream, points),
            None => StreamSession::begin(&bundled.rules, &bundled.stream),
        };
        Ok(StreamSessionHandle { session })
    }

    /// Options for `stage` (e.g. `"batch1"`) as a JSON array of
    /// `{name, cost}`.
    pub fn offer_options(&self, stage: &str) -> Result<String, JsError> {
        let stage = parse_stage(stage)?;
        to_json(&self.session.offer_options(stage))
    }

    /// Commit a JSON array of option names for `stage`.
    pub fn commit(&mut self, stage: &str, names_json: &str) -> Result<String, JsError> {
        let stage = parse_stage(stage)?;
        let names: Vec<String> = serde_json::from_str(names_json)
            .map_err(|e| JsError::new(&format!("Invalid names JSON: {e}")))?;
        let outcome = self
            .session
            .commit(stage, &names[..])
            .map_err(|e| JsError::new(&e.to_string()))?;
        let next_stage = match self.session.state() {
            SessionState::Awaiting(next) => Some(next),
            SessionState::Complete | SessionState::Invalid => None,
        };
        to_json(&CommitInfo {
            remaining_points: outcome.remaining_points,
            valid: outcome.valid,
            next_stage,
            overdraft: self.session.overdraft(),
        })
    }

    /// The stage awaiting a choice, or `null` once the session has ended.
    pub fn current_stage(&self) -> Result<String, JsError> {
        let stage = match self.session.state() {
            SessionState::Awaiting(stage) => Some(stage),
            _ => None,
        };
        to_json(&stage)
    }

    pub fn remaining_points(&self) -> i32 {
        self.session.remaining_points()
    }

    /// Session summary as JSON.
    pub fn summary(&self) -> Result<String, JsError> {
        to_json(&self.session.summary())
    }
}
