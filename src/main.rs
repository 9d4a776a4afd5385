mod catalog;
mod chat;
mod db;
mod engine;
mod error;
mod models;
mod notify;
mod profile;
mod tui;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use catalog::{Catalog, TestKind};
use chat::{ChatClient, DEFAULT_CHAT_URL, DEFAULT_USER_ID};
use db::Database;
use engine::AssessmentEngine;
use models::{JsonOutput, TestResult};
use profile::{recent_history, RECENT_LIMIT};

const DEFAULT_DB_NAME: &str = "campuscare.db";
const DB_ENV: &str = "CAMPUSCARE_DB";
const CHAT_URL_ENV: &str = "CAMPUSCARE_CHAT_URL";
const USER_ID_ENV: &str = "CAMPUSCARE_USER_ID";

#[derive(Parser)]
#[command(name = "campuscare")]
#[command(about = "Student mental-health self-assessments: PHQ-9, GAD-7, PSS-10 and sleep quality")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// List the available assessments
    Tests,

    /// Show an assessment's questions and answer options
    Show {
        /// Test key: phq9, gad7, pss10 or sleep
        kind: String,
    },

    /// Take an assessment non-interactively and save the result
    Score {
        /// Test key: phq9, gad7, pss10 or sleep
        kind: String,

        /// Comma-separated answer values, one per question
        #[arg(long, short)]
        answers: String,
    },

    /// List saved results, newest first
    Results {
        /// Maximum number of results to show
        #[arg(long, short)]
        limit: Option<usize>,
    },

    /// Show the most recent tests from both stored histories
    History,

    /// Delete all saved results
    Clear,

    /// Send a message to the therapist chat service
    Chat {
        /// Message text; omit to send the default greeting
        prompt: Option<String>,

        /// Chat service base URL
        #[arg(long)]
        chat_url: Option<String>,

        /// User id sent with the message
        #[arg(long)]
        user_id: Option<String>,
    },

    /// Launch interactive terminal UI
    Tui {
        /// Start directly in this test
        #[arg(long, short)]
        test: Option<String>,
    },
}

fn get_db_path() -> PathBuf {
    db_path_from(std::env::var(DB_ENV).ok())
}

fn db_path_from(env_value: Option<String>) -> PathBuf {
    if let Some(path) = env_value.filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }

    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("campuscare");

    std::fs::create_dir_all(&config_dir).ok();
    config_dir.join(DEFAULT_DB_NAME)
}

/// Flag first, then environment, then the built-in default.
fn resolve_setting(flag: Option<String>, env_var: &str, default: &str) -> String {
    flag.or_else(|| std::env::var(env_var).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| default.to_string())
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("campuscare=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli) {
        if json {
            if let Ok(out) = serde_json::to_string(&JsonOutput::<()>::err(e.to_string())) {
                println!("{}", out);
            }
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

fn open_db() -> Result<(Database, PathBuf), Box<dyn std::error::Error>> {
    let db_path = get_db_path();
    let db = Database::open(&db_path)?;
    db.init()?;
    Ok((db, db_path))
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::builtin();
    catalog.validate()?;

    match cli.command {
        Commands::Init => {
            let (_, db_path) = open_db()?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
            } else {
                println!("Database initialized at: {}", db_path.display());
            }
        }

        Commands::Tests => {
            if cli.json {
                let tests: Vec<_> = catalog
                    .definitions()
                    .iter()
                    .map(|d| {
                        serde_json::json!({
                            "kind": d.kind,
                            "testName": d.test_name,
                            "title": d.title,
                            "questions": d.question_count(),
                            "maxScore": d.max_score
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string(&JsonOutput::ok(&tests))?);
            } else {
                println!("{:<8} {:<24} {:>9} {:>6}", "KEY", "TITLE", "QUESTIONS", "MAX");
                println!("{}", "-".repeat(50));
                for def in catalog.definitions() {
                    println!(
                        "{:<8} {:<24} {:>9} {:>6}",
                        def.kind.as_str(),
                        truncate(&def.title, 24),
                        def.question_count(),
                        def.max_score
                    );
                }
            }
        }

        Commands::Show { kind } => {
            let def = catalog.get(TestKind::parse(&kind)?)?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(def))?);
            } else {
                println!("=== {} ===", def.title);
                for (i, question) in def.questions.iter().enumerate() {
                    println!();
                    let marker = if def.is_reverse_scored(i) { " (reverse scored)" } else { "" };
                    println!("{:>2}. {}{}", i + 1, question, marker);
                    for option in def.options_for(i) {
                        println!("      {} = {}", option.value, option.label);
                    }
                }
                println!();
                println!("--- Scoring ---");
                for range in &def.scoring_ranges {
                    println!("{:>2}-{:<3} {}", range.min, range.max, range.category);
                }
            }
        }

        Commands::Score { kind, answers } => {
            let kind = TestKind::parse(&kind)?;
            let answers = parse_answers(&answers)?;
            let (db, _) = open_db()?;
            let mut engine = AssessmentEngine::new(catalog, db)?;
            let result = take_test(&mut engine, kind, &answers)?;

            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&result))?);
            } else {
                println!("=== {} Result ===", result.test_name);
                println!();
                println!(
                    "Score: {}/{} ({:.0}%)",
                    result.score,
                    result.max_score,
                    result.percentage()
                );
                println!("Category: {}", result.category);
                println!("{}", result.description);
            }
        }

        Commands::Results { limit } => {
            let (db, _) = open_db()?;
            let mut results = db.load_results()?;
            if let Some(n) = limit {
                results.truncate(n);
            }
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&results))?);
            } else if results.is_empty() {
                println!("No results saved yet.");
            } else {
                println!("{:<20} {:<20} {:>7} CATEGORY", "TAKEN", "TEST", "SCORE");
                println!("{}", "-".repeat(75));
                for r in results {
                    println!(
                        "{:<20} {:<20} {:>7} {}",
                        r.timestamp.format("%Y-%m-%d %H:%M"),
                        truncate(&r.test_name, 20),
                        format!("{}/{}", r.score, r.max_score),
                        r.category
                    );
                }
            }
        }

        Commands::History => {
            let (db, _) = open_db()?;
            let entries = recent_history(
                &catalog,
                &db.load_results()?,
                &db.load_legacy_tests()?,
                RECENT_LIMIT,
            );
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&entries))?);
            } else if entries.is_empty() {
                println!("No tests taken yet.");
            } else {
                println!("=== Recent Tests ===");
                for e in entries {
                    let date = e
                        .taken_at
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:<12} {:<20} {:>7} {}",
                        date,
                        truncate(&e.name, 20),
                        format!("{}/{}", e.score, e.max_score),
                        e.category.as_deref().unwrap_or("-")
                    );
                }
            }
        }

        Commands::Clear => {
            let (db, _) = open_db()?;
            db.clear_results()?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
            } else {
                println!("Cleared all saved results.");
            }
        }

        Commands::Tui { test } => {
            let initial = test.as_deref().map(TestKind::parse).transpose()?;
            let (db, _) = open_db()?;
            let engine = AssessmentEngine::new(catalog, db)?;
            tui::run(engine, initial)?;
        }

        Commands::Chat {
            prompt,
            chat_url,
            user_id,
        } => {
            let base_url = resolve_setting(chat_url, CHAT_URL_ENV, DEFAULT_CHAT_URL);
            let user_id = resolve_setting(user_id, USER_ID_ENV, DEFAULT_USER_ID);
            let prompt = prompt.unwrap_or_else(|| chat::GREETING_PROMPT.to_string());

            let client = ChatClient::new(&base_url);
            let runtime = tokio::runtime::Runtime::new()?;
            let reply = runtime.block_on(client.send(&user_id, &prompt))?;

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "response": reply
                    })))?
                );
            } else {
                println!("{}", reply);
            }
        }
    }

    Ok(())
}

fn parse_answers(raw: &str) -> Result<Vec<u32>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .map_err(|_| format!("Invalid answer '{}'. Answers must be numbers", s))
        })
        .collect()
}

/// Walks the engine through every question in order, then submits.
fn take_test(
    engine: &mut AssessmentEngine,
    kind: TestKind,
    answers: &[u32],
) -> Result<TestResult, Box<dyn std::error::Error>> {
    let expected = engine.catalog().get(kind)?.question_count();
    if answers.len() != expected {
        return Err(format!(
            "{} expects {} answers, got {}",
            kind.as_str(),
            expected,
            answers.len()
        )
        .into());
    }

    engine.start_test(kind)?;
    for (i, &value) in answers.iter().enumerate() {
        engine.select_answer(value)?;
        if i + 1 < answers.len() {
            engine.go_to_next()?;
        }
    }
    Ok(engine.submit()?)
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    mod truncate_tests {
        use super::*;

        #[test]
        fn truncate_short_string() {
            assert_eq!(truncate("PHQ-9", 10), "PHQ-9");
        }

        #[test]
        fn truncate_exact_length() {
            assert_eq!(truncate("GAD-7", 5), "GAD-7");
        }

        #[test]
        fn truncate_long_string() {
            assert_eq!(truncate("Sleep Quality Test", 8), "Sleep...");
        }

        #[test]
        fn truncate_empty_string() {
            assert_eq!(truncate("", 10), "");
        }
    }

    mod cli_parsing_tests {
        use super::*;

        #[test]
        fn parse_init_command() {
            let cli = Cli::try_parse_from(["campuscare", "init"]).unwrap();
            assert!(!cli.json);
            assert!(matches!(cli.command, Commands::Init));
        }

        #[test]
        fn parse_init_with_json() {
            let cli = Cli::try_parse_from(["campuscare", "--json", "init"]).unwrap();
            assert!(cli.json);
            assert!(matches!(cli.command, Commands::Init));
        }

        #[test]
        fn parse_show_command() {
            let cli = Cli::try_parse_from(["campuscare", "show", "pss10"]).unwrap();
            match cli.command {
                Commands::Show { kind } => assert_eq!(kind, "pss10"),
                _ => panic!("Expected Show command"),
            }
        }

        #[test]
        fn parse_score_command() {
            let cli = Cli::try_parse_from([
                "campuscare",
                "score",
                "gad7",
                "--answers",
                "3,3,3,3,3,3,3",
            ])
            .unwrap();
            match cli.command {
                Commands::Score { kind, answers } => {
                    assert_eq!(kind, "gad7");
                    assert_eq!(answers, "3,3,3,3,3,3,3");
                }
                _ => panic!("Expected Score command"),
            }
        }

        #[test]
        fn parse_score_short_flag() {
            let cli = Cli::try_parse_from(["campuscare", "score", "sleep", "-a", "0,1,2,3,0"])
                .unwrap();
            assert!(matches!(cli.command, Commands::Score { .. }));
        }

        #[test]
        fn parse_results_with_limit() {
            let cli = Cli::try_parse_from(["campuscare", "results", "--limit", "3"]).unwrap();
            match cli.command {
                Commands::Results { limit } => assert_eq!(limit, Some(3)),
                _ => panic!("Expected Results command"),
            }
        }

        #[test]
        fn parse_results_without_limit() {
            let cli = Cli::try_parse_from(["campuscare", "results"]).unwrap();
            match cli.command {
                Commands::Results { limit } => assert!(limit.is_none()),
                _ => panic!("Expected Results command"),
            }
        }

        #[test]
        fn parse_history_command() {
            let cli = Cli::try_parse_from(["campuscare", "history"]).unwrap();
            assert!(matches!(cli.command, Commands::History));
        }

        #[test]
        fn parse_clear_command() {
            let cli = Cli::try_parse_from(["campuscare", "clear"]).unwrap();
            assert!(matches!(cli.command, Commands::Clear));
        }

        #[test]
        fn parse_chat_with_overrides() {
            let cli = Cli::try_parse_from([
                "campuscare",
                "chat",
                "I can't sleep",
                "--chat-url",
                "http://localhost:9000",
                "--user-id",
                "42",
            ])
            .unwrap();
            match cli.command {
                Commands::Chat {
                    prompt,
                    chat_url,
                    user_id,
                } => {
                    assert_eq!(prompt.as_deref(), Some("I can't sleep"));
                    assert_eq!(chat_url.as_deref(), Some("http://localhost:9000"));
                    assert_eq!(user_id.as_deref(), Some("42"));
                }
                _ => panic!("Expected Chat command"),
            }
        }

        #[test]
        fn parse_chat_without_prompt() {
            let cli = Cli::try_parse_from(["campuscare", "chat"]).unwrap();
            match cli.command {
                Commands::Chat { prompt, .. } => assert!(prompt.is_none()),
                _ => panic!("Expected Chat command"),
            }
        }

        #[test]
        fn parse_tui_with_test() {
            let cli = Cli::try_parse_from(["campuscare", "tui", "--test", "phq9"]).unwrap();
            match cli.command {
                Commands::Tui { test } => assert_eq!(test.as_deref(), Some("phq9")),
                _ => panic!("Expected Tui command"),
            }
        }

        #[test]
        fn parse_json_flag_global() {
            let cli1 = Cli::try_parse_from(["campuscare", "--json", "tests"]).unwrap();
            assert!(cli1.json);

            let cli2 = Cli::try_parse_from(["campuscare", "tests", "--json"]).unwrap();
            assert!(cli2.json);
        }

        #[test]
        fn parse_invalid_command_fails() {
            assert!(Cli::try_parse_from(["campuscare", "invalid"]).is_err());
        }

        #[test]
        fn parse_missing_required_arg_fails() {
            assert!(Cli::try_parse_from(["campuscare", "show"]).is_err());
            assert!(Cli::try_parse_from(["campuscare", "score", "phq9"]).is_err());
        }
    }

    mod answer_tests {
        use super::*;

        fn engine() -> AssessmentEngine {
            let db = Database::open(":memory:").unwrap();
            db.init().unwrap();
            AssessmentEngine::new(Catalog::builtin(), db).unwrap()
        }

        #[test]
        fn parse_answers_trims_whitespace() {
            assert_eq!(parse_answers("1, 2 ,3").unwrap(), vec![1, 2, 3]);
        }

        #[test]
        fn parse_answers_rejects_non_numbers() {
            let err = parse_answers("1,x,3").unwrap_err();
            assert!(err.contains("'x'"));
        }

        #[test]
        fn take_test_scores_and_persists() {
            let mut engine = engine();
            let result = take_test(&mut engine, TestKind::Gad7, &[3; 7]).unwrap();

            assert_eq!(result.score, 21);
            assert_eq!(result.category, "Severe Anxiety");
            assert_eq!(engine.db().load_results().unwrap().len(), 1);
            assert_eq!(engine.db().load_legacy_tests().unwrap().len(), 1);
        }

        #[test]
        fn take_test_applies_reverse_scoring() {
            let mut engine = engine();
            let result = take_test(&mut engine, TestKind::Pss10, &[4; 10]).unwrap();
            // six forward answers at 4, four reversed to 0
            assert_eq!(result.score, 24);
            assert_eq!(result.category, "Moderate Stress");
        }

        #[test]
        fn take_test_rejects_wrong_answer_count() {
            let mut engine = engine();
            let err = take_test(&mut engine, TestKind::Phq9, &[0; 5]).unwrap_err();
            assert!(err.to_string().contains("expects 9 answers, got 5"));
            assert!(engine.db().load_results().unwrap().is_empty());
        }

        #[test]
        fn take_test_rejects_out_of_range_value() {
            let mut engine = engine();
            let err = take_test(&mut engine, TestKind::Sleep, &[0, 1, 7, 0, 0]).unwrap_err();
            assert!(err.to_string().contains("not a valid answer for question 3"));
            assert!(engine.db().load_results().unwrap().is_empty());
        }
    }

    mod config_tests {
        use super::*;
        use std::env;

        #[test]
        fn db_path_uses_env_value() {
            let test_path = "/tmp/test_campuscare.db";
            let path = db_path_from(Some(test_path.to_string()));
            assert_eq!(path.to_str().unwrap(), test_path);
        }

        #[test]
        fn db_path_ignores_empty_env_value() {
            let path = db_path_from(Some(String::new()));
            assert!(path.to_str().unwrap().ends_with("campuscare.db"));
        }

        #[test]
        fn db_path_default_includes_campuscare_db() {
            let path = db_path_from(None);
            let path_str = path.to_str().unwrap();

            assert!(path_str.ends_with("campuscare.db"));
            assert!(path_str.contains("campuscare"));
        }

        #[test]
        fn resolve_setting_prefers_flag() {
            env::set_var("CAMPUSCARE_TEST_FLAG_WINS", "from-env");
            let value = resolve_setting(
                Some("from-flag".to_string()),
                "CAMPUSCARE_TEST_FLAG_WINS",
                "default",
            );
            assert_eq!(value, "from-flag");
            env::remove_var("CAMPUSCARE_TEST_FLAG_WINS");
        }

        #[test]
        fn resolve_setting_falls_back_to_env_then_default() {
            env::set_var("CAMPUSCARE_TEST_ENV_WINS", "from-env");
            assert_eq!(
                resolve_setting(None, "CAMPUSCARE_TEST_ENV_WINS", "default"),
                "from-env"
            );
            env::remove_var("CAMPUSCARE_TEST_ENV_WINS");

            assert_eq!(
                resolve_setting(None, "CAMPUSCARE_TEST_UNSET", DEFAULT_USER_ID),
                "123"
            );
        }
    }
}
