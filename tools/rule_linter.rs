/// Rule Linter: validates rule table coverage and drawability.
///
/// Usage: rule_linter <rules.ron> [--stream <stream.ron>]

use challenge_engine::core::allocator::{Allocator, AllocatorConfig};
use challenge_engine::core::finisher;
use challenge_engine::core::rules::{RuleTable, StreamRules};
use challenge_engine::schema::trait_kind::TraitKind;
use std::path::Path;
use std::process;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .without_time()
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: rule_linter <rules.ron> [--stream <stream.ron>]");
        process::exit(0);
    }

    let rules_path = &args[1];
    let mut stream_path = None;

    let mut i = 2;
    while i < args.len() {
        if args[i] == "--stream" && i + 1 < args.len() {
            i += 1;
            stream_path = Some(args[i].clone());
        }
        i += 1;
    }

    let rules = match RuleTable::load_from_ron(Path::new(rules_path)) {
        Ok(rules) => rules,
        Err(e) => {
            eprintln!("ERROR: Failed to load rule table: {}", e);
            process::exit(1);
        }
    };

    let positive = rules.traits(TraitKind::Positive).count();
    let negative = rules.traits(TraitKind::Negative).count();
    println!("Loaded {} positive and {} negative traits", positive, negative);

    let (mut errors, mut warnings) = lint_rules(&rules, &AllocatorConfig::default());

    if let Some(ref path) = stream_path {
        match StreamRules::load_from_ron(Path::new(path), &rules) {
            Ok(stream) => {
                let (e, w) = lint_stream(&stream);
                errors.extend(e);
                warnings.extend(w);
            }
            Err(e) => errors.push(format!("stream rules: {}", e)),
        }
    }

    println!("\n=== Rule Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn lint_rules(rules: &RuleTable, config: &AllocatorConfig) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Exclusions naming traits that exist nowhere
    let known = |name: &str| rules.lookup(name).is_some() || finisher::is_filler(name);
    for (a, b) in rules.exclusion_pairs() {
        for name in [a, b] {
            if !known(name) {
                errors.push(format!(
                    "exclusion '{}' / '{}' names unknown trait '{}'",
                    a, b, name
                ));
            }
        }
    }

    // Every difficulty must resolve in every category
    let difficulties: Vec<_> = rules.difficulties().collect();
    if difficulties.is_empty() {
        errors.push("no difficulties defined in end_trait_value".to_string());
    }
    for difficulty in &difficulties {
        if let Err(e) = rules.difficulty(difficulty) {
            errors.push(e.to_string());
        }
    }

    // Traits the tolerance gate can never admit
    for kind in [TraitKind::Positive, TraitKind::Negative] {
        for (name, cost) in rules.traits(kind) {
            if i64::from(cost).abs() > i64::from(config.tolerance_seed) {
                warnings.push(format!(
                    "{} trait '{}' costs {} and never passes the tolerance gate (seed {})",
                    kind.label(),
                    name,
                    cost,
                    config.tolerance_seed
                ));
            }
        }
    }

    // Traits left out of draw pools because of filler conflicts
    let allocator = Allocator::new(rules, *config);
    for kind in [TraitKind::Positive, TraitKind::Negative] {
        let pool = allocator.pool(kind);
        for (name, _) in rules.traits(kind) {
            if !pool.iter().any(|p| p == name) {
                warnings.push(format!(
                    "{} trait '{}' is never drawn: it is a filler or excluded by one",
                    kind.label(),
                    name
                ));
            }
        }
    }

    (errors, warnings)
}

fn lint_stream(stream: &StreamRules) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if stream.total_points() <= 0 {
        errors.push(format!(
            "stream total_points is {}, nothing can be afforded",
            stream.total_points()
        ));
    }

    for stage in challenge_engine::schema::stage::Stage::ALL {
        let catalog = stream.catalog(stage);
        let real: Vec<_> = catalog
            .iter()
            .filter(|(name, _)| *name != stream.skip_option())
            .collect();
        if real.is_empty() {
            errors.push(format!("stream stage {:?} has no options", stage));
            continue;
        }
        if let Some(cheapest) = real.iter().map(|(_, cost)| *cost).min() {
            if cheapest > stream.total_points() {
                warnings.push(format!(
                    "every {:?} option costs more than the {} point pool",
                    stage,
                    stream.total_points()
                ));
            }
        }
    }

    (errors, warnings)
}
