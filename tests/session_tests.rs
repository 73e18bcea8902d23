/// Stream session integration tests: fixture and bundled stream rules.

use challenge_engine::core::rules::{RuleTable, StreamRules};
use challenge_engine::core::session::{SessionError, SessionState, StreamSession};
use challenge_engine::schema::stage::Stage;
use std::path::Path;

fn fixture() -> (RuleTable, StreamRules) {
    let rules = RuleTable::load_from_ron(Path::new("tests/fixtures/test_rules.ron")).unwrap();
    let stream =
        StreamRules::load_from_ron(Path::new("tests/fixtures/test_stream.ron"), &rules).unwrap();
    (rules, stream)
}

#[test]
fn bundled_stream_rules_load() {
    let rules = RuleTable::load_from_ron(Path::new("rule_data/survival/rules.ron")).unwrap();
    let stream =
        StreamRules::load_from_ron(Path::new("rule_data/survival/stream.ron"), &rules).unwrap();
    assert_eq!(stream.total_points(), 30);
    for stage in Stage::ALL {
        assert!(!stream.catalog(stage).is_empty(), "{:?} has no options", stage);
    }
}

#[test]
fn stream_option_missing_from_rules_is_rejected() {
    let rules = RuleTable::load_from_ron(Path::new("tests/fixtures/test_rules.ron")).unwrap();
    let stream = r#"(
        total_points: 10,
        starting_areas: {"Riverside": 2},
        batch_one: ["Sleepwalker"],
        batch_two: [],
        batch_three: [],
        missions: {},
    )"#;
    assert!(StreamRules::parse_ron(stream, &rules).is_err());
}

#[test]
fn budget_walkthrough() {
    let (rules, stream) = fixture();
    let mut session = StreamSession::begin(&rules, &stream);

    let outcome = session.commit(Stage::Location, &["Muldraugh"]).unwrap();
    assert_eq!(outcome.remaining_points, 15);

    // Illiterate costs its substitute value inside a session.
    let batch1 = session.offer_options(Stage::Batch1);
    let illiterate = batch1.iter().find(|o| o.name == "Illiterate").unwrap();
    assert_eq!(illiterate.cost, 6);

    session
        .commit(Stage::Batch1, &["Illiterate", "Hard of Hearing"])
        .unwrap();
    assert_eq!(session.remaining_points(), 5);

    // Deaf conflicts with Hard of Hearing; Weak is unaffordable.
    let batch2: Vec<String> = session
        .offer_options(Stage::Batch2)
        .into_iter()
        .map(|o| o.name)
        .collect();
    assert_eq!(batch2, vec!["Select nothing", "Unlucky"]);

    session.commit(Stage::Batch2, &["Unlucky"]).unwrap();
    session.commit(Stage::Batch3, &["Select nothing"]).unwrap();
    let outcome = session
        .commit(Stage::Mission, &["Survive the first week"])
        .unwrap();

    assert!(outcome.valid);
    assert_eq!(outcome.remaining_points, 0);
    assert_eq!(session.state(), SessionState::Complete);

    let summary = session.summary();
    assert_eq!(
        summary.negative_traits,
        vec!["Illiterate", "Hard of Hearing", "Unlucky"]
    );
    assert!(summary.valid);
}

#[test]
fn overdraw_ends_the_session() {
    let (rules, stream) = fixture();
    let mut session = StreamSession::with_points(&rules, &stream, 10);

    let outcome = session.commit(Stage::Location, &["Louisville"]).unwrap();
    assert_eq!(outcome.remaining_points, -2);
    assert!(!outcome.valid);
    assert_eq!(session.overdraft(), Some(2));
    assert!(session.offer_options(Stage::Batch1).is_empty());
    assert!(matches!(
        session.commit(Stage::Batch1, &["Smoker"]),
        Err(SessionError::Closed(SessionState::Invalid))
    ));
    assert!(!session.summary().valid);
}

#[test]
fn within_choice_exclusion_is_refused() {
    let (rules, stream) = fixture();
    let mut session = StreamSession::begin(&rules, &stream);
    session.commit(Stage::Location, &["Riverside"]).unwrap();
    let err = session
        .commit(Stage::Batch1, &["Slow Reader", "Illiterate"])
        .unwrap_err();
    assert!(matches!(err, SessionError::Excluded { .. }));
    assert_eq!(session.state(), SessionState::Awaiting(Stage::Batch1));
}
