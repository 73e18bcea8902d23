/// Preview: bulk challenge generation and an interactive stream session.
///
/// Usage: preview <rules.ron> [--difficulty D] [--count N] [--seed S] [--stream <stream.ron>]
///
/// Without `--stream`, generates N challenges and prints each plus the
/// success rate. With `--stream`, opens a shell:
///   offer                - list options for the current stage
///   pick <a>[, <b>...]   - commit choices for the current stage
///   summary              - print the session summary
///   reset                - start a new session
///   help                 - list commands
///   quit                 - exit

use challenge_engine::core::generator::ChallengeGenerator;
use challenge_engine::core::rules::{RuleTable, StreamRules};
use challenge_engine::core::session::{SessionState, StreamSession};
use challenge_engine::schema::challenge::{Challenge, Difficulty};
use std::io::{self, BufRead, Write};
use std::path::Path;

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
        print_usage();
        return;
    }

    let rules_path = args[1].clone();
    let mut difficulty = None;
    let mut count: usize = 10;
    let mut seed: u64 = 42;
    let mut stream_path = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--difficulty" if i + 1 < args.len() => {
                i += 1;
                difficulty = Some(Difficulty::new(args[i].as_str()));
            }
            "--count" if i + 1 < args.len() => {
                i += 1;
                count = args[i].parse().unwrap_or(10);
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            "--stream" if i + 1 < args.len() => {
                i += 1;
                stream_path = Some(args[i].clone());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let rules = match RuleTable::load_from_ron(Path::new(&rules_path)) {
        Ok(rules) => rules,
        Err(e) => {
            eprintln!("ERROR: Failed to load rule table: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(path) = stream_path {
        let stream = match StreamRules::load_from_ron(Path::new(&path), &rules) {
            Ok(stream) => stream,
            Err(e) => {
                eprintln!("ERROR: Failed to load stream rules: {}", e);
                std::process::exit(1);
            }
        };
        run_stream_shell(&rules, &stream);
        return;
    }

    let difficulties: Vec<Difficulty> = match difficulty {
        Some(d) => vec![d],
        None => rules.difficulties().collect(),
    };

    let mut generator = match ChallengeGenerator::builder()
        .with_rules(rules)
        .seed(seed)
        .build()
    {
        Ok(generator) => generator,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    println!("Seed: {}", seed);

    for difficulty in &difficulties {
        println!("\n=== {} x{} ===\n", difficulty, count);

        let mut succeeded = 0;
        let mut errors = 0;
        for n in 0..count {
            match generator.generate(difficulty) {
                Ok(challenge) => {
                    if challenge.succeeded {
                        succeeded += 1;
                    }
                    print_challenge(n + 1, &challenge);
                }
                Err(e) => {
                    errors += 1;
                    println!("[{}] ERROR: {}", n + 1, e);
                }
            }
        }

        let rate = if count > 0 {
            succeeded as f64 / count as f64 * 100.0
        } else {
            0.0
        };
        println!(
            "\nSuccess rate: {}/{} ({:.1}%), {} errors",
            succeeded, count, rate, errors
        );
    }
}

fn print_challenge(n: usize, challenge: &Challenge) {
    let status = if challenge.succeeded { "ok" } else { "FAILED" };
    println!(
        "[{}] {} | {} | {} -> {}/{} ({})",
        n,
        challenge.location,
        challenge.profession,
        challenge.mission,
        challenge.final_value,
        challenge.target_value,
        status
    );
    println!("    settings: {}", challenge.settings);
    println!("    positive: {}", challenge.positive_traits.join(", "));
    println!("    negative: {}", challenge.negative_traits.join(", "));
}

fn run_stream_shell(rules: &RuleTable, stream: &StreamRules) {
    let mut session = StreamSession::begin(rules, stream);
    println!("Stream session with {} points", session.total_points());
    println!("Type 'help' for commands.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("stream> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));

        match cmd.to_lowercase().as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => print_shell_help(),
            "offer" => match session.state() {
                SessionState::Awaiting(stage) => {
                    println!(
                        "{:?} ({} points left):",
                        stage,
                        session.remaining_points()
                    );
                    for option in session.offer_options(stage) {
                        println!("  {:>3}  {}", option.cost, option.name);
                    }
                }
                state => println!("Session is {:?}; nothing to offer.", state),
            },
            "pick" => {
                let SessionState::Awaiting(stage) = session.state() else {
                    println!("Session is {:?}; use 'reset'.", session.state());
                    continue;
                };
                let names: Vec<&str> = rest
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect();
                match session.commit(stage, &names[..]) {
                    Ok(outcome) if outcome.valid => {
                        println!("Committed. {} points left.", outcome.remaining_points);
                    }
                    Ok(_) => {
                        println!(
                            "Overdrawn by {} points. Session is invalid.",
                            session.overdraft().unwrap_or(0)
                        );
                    }
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "summary" => {
                let summary = session.summary();
                println!("  location: {}", summary.location.as_deref().unwrap_or("-"));
                println!("  traits:   {}", summary.negative_traits.join(", "));
                println!("  missions: {}", summary.missions.join(", "));
                println!("  points:   {}", summary.remaining_points);
                println!("  valid:    {}", summary.valid);
            }
            "reset" => {
                session = StreamSession::begin(rules, stream);
                println!("New session with {} points.", session.total_points());
            }
            other => println!("Unknown command: {}", other),
        }
    }
}

fn print_usage() {
    println!("Usage: preview <rules.ron> [--difficulty D] [--count N] [--seed S] [--stream <stream.ron>]");
}

fn print_shell_help() {
    println!("Commands:");
    println!("  offer                - list options for the current stage");
    println!("  pick <a>[, <b>...]   - commit choices for the current stage");
    println!("  summary              - print the session summary");
    println!("  reset                - start a new session");
    println!("  quit                 - exit");
}
