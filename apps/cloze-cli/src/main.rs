//! Command-line driver for cloze exercises.
//!
//! Usage:
//!   cloze parse `<file>`                                   - Print the parsed passage
//!   cloze check `<file>` --answer cloze0=Paris [...]       - Evaluate answers
//!   cloze solutions `<file>`                               - Print the solution per blank

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cloze_core::{
    AnswerState, BlankId, Cloze, ClozeElement, Evaluation, ExerciseDefinition, Feedback, MatchingPolicy,
    PolicyOverrides, SpellingErrorBehaviour,
};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "cloze", version, about = "Load and check fill-in-the-blank exercises")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the anchor markup, elements and blanks of an exercise
    Parse { file: PathBuf },
    /// Evaluate answers and print states, feedback and score
    Check {
        file: PathBuf,
        /// Answer for one blank, as `id=text` (repeatable)
        #[arg(short, long = "answer", value_parser = parse_answer)]
        answers: Vec<(BlankId, String)>,
        #[command(flatten)]
        overrides: OverrideArgs,
    },
    /// Print the solution text of every blank
    Solutions {
        file: PathBuf,
        /// Join every correct alternative instead of showing the first
        #[arg(long)]
        all: bool,
    },
}

#[derive(clap::Args, Debug, Default)]
struct OverrideArgs {
    #[arg(long)]
    case_sensitive: Option<bool>,
    #[arg(long)]
    regex: Option<bool>,
    #[arg(long, value_enum)]
    spelling: Option<SpellingArg>,
    #[arg(long)]
    typo_divisor: Option<usize>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SpellingArg {
    Off,
    Warn,
    Accept,
}

impl From<SpellingArg> for SpellingErrorBehaviour {
    fn from(arg: SpellingArg) -> Self {
        match arg {
            SpellingArg::Off => SpellingErrorBehaviour::Off,
            SpellingArg::Warn => SpellingErrorBehaviour::Warn,
            SpellingArg::Accept => SpellingErrorBehaviour::Accept,
        }
    }
}

impl From<OverrideArgs> for PolicyOverrides {
    fn from(args: OverrideArgs) -> Self {
        PolicyOverrides {
            case_sensitive: args.case_sensitive,
            use_regex: args.regex,
            spelling: args.spelling.map(Into::into),
            show_all_solutions: None,
            typo_divisor: args.typo_divisor,
        }
    }
}

/// Parse `cloze0=Paris` into a blank id and the entered text.
fn parse_answer(raw: &str) -> std::result::Result<(BlankId, String), String> {
    let (id, text) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected id=text, got '{}'", raw))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(format!("missing blank id in '{}'", raw));
    }
    Ok((BlankId(id.to_string()), text.to_string()))
}

#[derive(Serialize)]
struct ParseReport<'a> {
    html: &'a str,
    elements: &'a [ClozeElement],
    blanks: Vec<&'a str>,
    highlights: Vec<&'a str>,
}

#[derive(Serialize)]
struct BlankReport {
    id: String,
    entered_text: String,
    state: AnswerState,
    #[serde(skip_serializing_if = "Option::is_none")]
    feedback: Option<Feedback>,
}

#[derive(Serialize)]
struct CheckReport {
    blanks: Vec<BlankReport>,
    score: usize,
    max_score: usize,
    solved: bool,
}

fn load_definition(path: &Path) -> Result<ExerciseDefinition> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid exercise in {}", path.display()))
}

fn load(definition: &ExerciseDefinition, overrides: &PolicyOverrides) -> Result<Cloze> {
    let policy = MatchingPolicy::from_behaviour(&definition.behaviour).merge(overrides);
    Cloze::with_policy(definition, policy).map_err(|e| anyhow!("{}: {}", e, e.details()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_parse(file: &Path) -> Result<()> {
    let cloze = load(&load_definition(file)?, &PolicyOverrides::default())?;
    print_json(&ParseReport {
        html: &cloze.html,
        elements: &cloze.elements,
        blanks: cloze.blanks().iter().map(|b| b.id.as_str()).collect(),
        highlights: cloze.highlights().iter().map(|h| h.text.as_str()).collect(),
    })
}

fn run_check(file: &Path, answers: &[(BlankId, String)], overrides: PolicyOverrides) -> Result<()> {
    let mut cloze = load(&load_definition(file)?, &overrides)?;

    let mut feedback = Vec::with_capacity(answers.len());
    for (id, text) in answers {
        let evaluation = cloze
            .evaluate(id, text, false, true)
            .with_context(|| format!("cannot answer {}", id))?;
        tracing::info!(blank = %id, state = ?cloze.blank(id)?.state(), "checked answer");
        if let Evaluation::Evaluated { feedback: Some(f), .. } = evaluation {
            feedback.push(f);
        }
    }

    let blanks = cloze
        .blanks()
        .iter()
        .map(|blank| BlankReport {
            id: blank.id.to_string(),
            entered_text: blank.entered_text.clone(),
            state: blank.state(),
            feedback: feedback.iter().rev().find(|f| f.blank == blank.id).cloned(),
        })
        .collect();

    print_json(&CheckReport {
        blanks,
        score: cloze.current_score(),
        max_score: cloze.max_score(),
        solved: cloze.is_solved(),
    })
}

fn run_solutions(file: &Path, all: bool) -> Result<()> {
    let overrides = PolicyOverrides {
        show_all_solutions: Some(all),
        ..PolicyOverrides::default()
    };
    let mut cloze = load(&load_definition(file)?, &overrides)?;
    cloze.show_solutions();

    let solutions: Vec<(String, String)> = cloze
        .blanks()
        .iter()
        .map(|b| (b.id.to_string(), b.entered_text.clone()))
        .collect();
    print_json(&solutions)
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match Cli::parse().command {
        Command::Parse { file } => run_parse(&file),
        Command::Check {
            file,
            answers,
            overrides,
        } => run_check(&file, &answers, overrides.into()),
        Command::Solutions { file, all } => run_solutions(&file, all),
    }
}
