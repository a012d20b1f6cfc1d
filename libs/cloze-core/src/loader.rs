//! Builds blanks from an authored exercise definition.
//!
//! # Format
//! ```json
//! {
//!   "text": "The capital of France is ___.",
//!   "behaviour": { "spelling_error_behaviour": "warn" },
//!   "blanks": [{
//!     "correct_answer_text": "Paris",
//!     "hint": "A city on the Seine.",
//!     "incorrect_answers": [
//!       { "incorrect_answer_text": "Lyon/Marseille", "incorrect_answer_feedback": "Too far south." }
//!     ]
//!   }]
//! }
//! ```
//! Alternatives are separated by `/`; write `\/` for a literal slash.

use crate::blank::Blank;
use crate::brackets::validate_regex_brackets;
use crate::error::{ClozeError, Result, UnbalancedBlank};
use crate::types::{Alternative, AnswerSet, Behaviour, BlankId, MatchingPolicy, Message};
use serde::{Deserialize, Serialize};

/// An exercise as stored by the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExerciseDefinition {
    pub text: String,
    pub blanks: Vec<BlankDefinition>,
    pub snippets: Vec<Snippet>,
    pub behaviour: Behaviour,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlankDefinition {
    pub correct_answer_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub incorrect_answers: Vec<IncorrectAnswerDefinition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IncorrectAnswerDefinition {
    /// Empty text makes the feedback apply to any wrong answer.
    pub incorrect_answer_text: String,
    pub incorrect_answer_feedback: String,
    pub show_highlight: bool,
    /// Relative highlight position, e.g. `-1` for the nearest one before.
    pub highlight: i32,
}

/// Reusable text referenced as `@name` in feedback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snippet {
    pub name: String,
    pub text: String,
}

/// Split authored answer text into alternatives.
pub fn split_alternatives(text: &str) -> Vec<String> {
    let mut alternatives = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'/') => {
                chars.next();
                current.push('/');
            }
            '/' => alternatives.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    alternatives.push(current);

    alternatives
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect()
}

/// Replace `@name` references with snippet text. Longer names are replaced
/// first so `@ab` is not eaten by `@a`.
pub fn replace_snippets(text: &str, snippets: &[Snippet]) -> String {
    let mut ordered: Vec<&Snippet> = snippets.iter().filter(|s| !s.name.is_empty()).collect();
    ordered.sort_by(|a, b| b.name.len().cmp(&a.name.len()));

    ordered.iter().fold(text.to_string(), |acc, snippet| {
        acc.replace(&format!("@{}", snippet.name), &snippet.text)
    })
}

/// Reject pattern alternatives with unbalanced brackets before any of them
/// is compiled.
fn check_brackets(definitions: &[BlankDefinition]) -> Result<()> {
    let unbalanced: Vec<UnbalancedBlank> = definitions
        .iter()
        .enumerate()
        .filter(|(_, def)| !def.correct_answer_text.trim().is_empty())
        .filter_map(|(index, def)| {
            let texts = split_alternatives(&def.correct_answer_text).into_iter().chain(
                def.incorrect_answers
                    .iter()
                    .flat_map(|answer| split_alternatives(&answer.incorrect_answer_text)),
            );
            validate_regex_brackets(texts).map(|alternatives| UnbalancedBlank {
                blank_number: index + 1,
                alternatives,
            })
        })
        .collect();

    if unbalanced.is_empty() {
        Ok(())
    } else {
        Err(ClozeError::UnbalancedBrackets(unbalanced))
    }
}

fn alternatives(text: &str, policy: &MatchingPolicy) -> Vec<Alternative> {
    split_alternatives(text)
        .into_iter()
        .map(|a| Alternative::with_mode(a, policy.use_regex))
        .collect()
}

/// Build the authored blanks in order, skipping those without a correct
/// answer.
pub fn build_blanks(definition: &ExerciseDefinition, policy: &MatchingPolicy) -> Result<Vec<Blank>> {
    if policy.use_regex {
        check_brackets(&definition.blanks)?;
    }

    let snippets = &definition.snippets;
    let mut blanks = Vec::with_capacity(definition.blanks.len());

    for (index, def) in definition.blanks.iter().enumerate() {
        let correct = alternatives(&def.correct_answer_text, policy);
        if correct.is_empty() {
            tracing::debug!(blank = index, "skipping blank without a correct answer");
            continue;
        }

        let mut blank = Blank::new(
            BlankId::from_index(index),
            AnswerSet::new(correct, Message::default()),
        );
        blank.correct_feedback = def
            .correct_feedback
            .as_deref()
            .map(|text| replace_snippets(text, snippets))
            .filter(|text| !text.is_empty());
        if let Some(hint) = &def.hint {
            blank.set_hint(Message::new(replace_snippets(hint, snippets)));
        }

        for answer in &def.incorrect_answers {
            let mut message = Message::new(replace_snippets(&answer.incorrect_answer_feedback, snippets));
            if answer.show_highlight && answer.highlight != 0 {
                message = message.with_highlight_position(answer.highlight);
            }
            blank.add_incorrect_answer(AnswerSet::new(
                alternatives(&answer.incorrect_answer_text, policy),
                message,
            ));
        }

        blanks.push(blank);
    }

    Ok(blanks)
}
