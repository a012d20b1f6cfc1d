//! Decision table for evaluating a blank.
//!
//! The rules are tried top to bottom and the first one that yields a verdict
//! wins. Each rule only looks at the precomputed [`Candidates`], so the
//! ordering and fall-through can be tested without a full blank.

use crate::blank::Blank;
use crate::matching::{best_match, spelling_mistake, Correctness, DiffSegment, MatchOutcome, MatchPass};
use crate::types::{AnswerState, BlankId, HighlightId, MatchingPolicy, MessageType};
use serde::{Deserialize, Serialize};

/// Incorrect pattern that matches anything.
const CATCH_ALL_PATTERN: &str = ".*";

/// A feedback request for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub blank: BlankId,
    pub kind: MessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Character diff for near misses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mistake: Option<Vec<DiffSegment>>,
    /// Highlight to point the message at and activate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<HighlightId>,
}

/// Result of an evaluation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Evaluation {
    /// The text was already evaluated; nothing changed.
    Unchanged,
    Evaluated {
        state: AnswerState,
        #[serde(skip_serializing_if = "Option::is_none")]
        feedback: Option<Feedback>,
    },
}

impl Evaluation {
    pub fn feedback(&self) -> Option<&Feedback> {
        match self {
            Self::Evaluated { feedback, .. } => feedback.as_ref(),
            Self::Unchanged => None,
        }
    }
}

/// Best matches of the learner's text, one per category.
#[derive(Debug, Clone, Default)]
pub(crate) struct Candidates {
    pub exact_correct: Option<MatchOutcome>,
    pub close_correct: Option<MatchOutcome>,
    pub exact_incorrect: Option<MatchOutcome>,
    pub close_incorrect: Option<MatchOutcome>,
    /// First alternative of the set behind `exact_incorrect`.
    pub exact_incorrect_lead: Option<String>,
    /// First incorrect answer set flagged as always applying.
    pub always_applying: Option<usize>,
}

impl Candidates {
    pub fn collect(blank: &Blank, text: &str, policy: &MatchingPolicy) -> Self {
        let correct = std::slice::from_ref(&blank.correct);
        let exact_incorrect = best_match(
            &blank.incorrect,
            text,
            policy,
            MatchPass::Strict,
            Correctness::ExactMatch,
        );
        let exact_incorrect_lead = exact_incorrect
            .as_ref()
            .and_then(|m| m.answer_set)
            .and_then(|set| blank.incorrect.get(set))
            .and_then(|set| set.alternatives.first())
            .map(|a| a.text.clone());

        Self {
            exact_correct: best_match(correct, text, policy, MatchPass::Strict, Correctness::ExactMatch),
            close_correct: best_match(correct, text, policy, MatchPass::Spelling, Correctness::CloseMatch),
            exact_incorrect,
            exact_incorrect_lead,
            close_incorrect: best_match(
                &blank.incorrect,
                text,
                policy,
                MatchPass::Strict,
                Correctness::CloseMatch,
            ),
            always_applying: blank.incorrect.iter().position(|set| set.applies_always),
        }
    }
}

/// Feedback to emit, before it is resolved against the blank's messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FeedbackSource {
    /// The blank's feedback for correct answers, if authored.
    CorrectFeedback,
    /// Message and highlight of an incorrect answer set.
    IncorrectAnswer(usize),
    /// Spelling diff against this correct alternative.
    SpellingMistake(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Verdict {
    pub state: AnswerState,
    pub feedback: Option<FeedbackSource>,
    /// Replaces the entered text with the canonical spelling.
    pub canonical_text: Option<String>,
}

impl Verdict {
    fn error(feedback: Option<FeedbackSource>) -> Self {
        Self {
            state: AnswerState::Error,
            feedback,
            canonical_text: None,
        }
    }

    fn retry(expected: &str) -> Self {
        Self {
            state: AnswerState::Retry,
            feedback: Some(FeedbackSource::SpellingMistake(expected.to_string())),
            canonical_text: None,
        }
    }
}

pub(crate) struct Rule {
    pub name: &'static str,
    pub apply: fn(&Candidates, &MatchingPolicy) -> Option<Verdict>,
}

pub(crate) const RULES: &[Rule] = &[
    Rule {
        name: "exact_correct",
        apply: exact_correct,
    },
    Rule {
        name: "exact_incorrect",
        apply: exact_incorrect,
    },
    Rule {
        name: "close_correct",
        apply: close_correct,
    },
    Rule {
        name: "close_incorrect",
        apply: close_incorrect,
    },
    Rule {
        name: "always_applying",
        apply: always_applying,
    },
    Rule {
        name: "no_match",
        apply: no_match,
    },
];

/// Run the rules in order and return the first verdict.
pub(crate) fn decide(candidates: &Candidates, policy: &MatchingPolicy) -> (&'static str, Verdict) {
    for rule in RULES {
        if let Some(verdict) = (rule.apply)(candidates, policy) {
            return (rule.name, verdict);
        }
    }
    // `no_match` always applies; kept for exhaustiveness.
    ("no_match", Verdict::error(None))
}

fn exact_correct(c: &Candidates, policy: &MatchingPolicy) -> Option<Verdict> {
    let matched = c.exact_correct.as_ref()?;
    Some(Verdict {
        state: AnswerState::Correct,
        feedback: Some(FeedbackSource::CorrectFeedback),
        // Unlike literal answers, regex matches keep the learner's text even
        // when matching ignores case: a pattern source is not a spelling to
        // write back into the blank.
        canonical_text: (!policy.case_sensitive && !policy.use_regex)
            .then(|| matched.alternative.clone()),
    })
}

fn exact_incorrect(c: &Candidates, policy: &MatchingPolicy) -> Option<Verdict> {
    let matched = c.exact_incorrect.as_ref()?;
    let set = matched.answer_set.unwrap_or_default();

    // A set led by the catch-all pattern only flags answers that are not near
    // misses of a correct one.
    if policy.use_regex
        && policy.warn_spelling_errors()
        && c.exact_incorrect_lead.as_deref() == Some(CATCH_ALL_PATTERN)
    {
        if let Some(close) = &c.close_correct {
            return Some(Verdict::retry(&close.alternative));
        }
    }
    Some(Verdict::error(Some(FeedbackSource::IncorrectAnswer(set))))
}

fn close_correct(c: &Candidates, policy: &MatchingPolicy) -> Option<Verdict> {
    let close = c.close_correct.as_ref()?;
    if policy.warn_spelling_errors() {
        Some(Verdict::retry(&close.alternative))
    } else if policy.accept_spelling_errors() {
        Some(Verdict {
            state: AnswerState::Correct,
            feedback: None,
            canonical_text: Some(close.alternative.clone()),
        })
    } else {
        None
    }
}

fn close_incorrect(c: &Candidates, _policy: &MatchingPolicy) -> Option<Verdict> {
    let close = c.close_incorrect.as_ref()?;
    Some(Verdict::error(Some(FeedbackSource::IncorrectAnswer(
        close.answer_set.unwrap_or_default(),
    ))))
}

fn always_applying(c: &Candidates, _policy: &MatchingPolicy) -> Option<Verdict> {
    c.always_applying
        .map(|set| Verdict::error(Some(FeedbackSource::IncorrectAnswer(set))))
}

fn no_match(_c: &Candidates, _policy: &MatchingPolicy) -> Option<Verdict> {
    Some(Verdict::error(None))
}

/// Turn a feedback source into a request, or `None` when there is nothing to
/// show.
pub(crate) fn resolve_feedback(
    blank: &Blank,
    verdict: &Verdict,
    policy: &MatchingPolicy,
) -> Option<Feedback> {
    let (kind, text, mistake, highlight) = match verdict.feedback.as_ref()? {
        FeedbackSource::CorrectFeedback => {
            let text = blank.correct_feedback.clone().filter(|t| !t.is_empty())?;
            (MessageType::Correct, Some(text), None, None)
        }
        FeedbackSource::IncorrectAnswer(index) => {
            let set = blank.incorrect.get(*index)?;
            let text = Some(set.message.text.clone()).filter(|t| !t.is_empty());
            let highlight = set.message.highlight;
            if text.is_none() && highlight.is_none() {
                return None;
            }
            (MessageType::Error, text, None, highlight)
        }
        FeedbackSource::SpellingMistake(expected) => (
            MessageType::Retry,
            None,
            Some(spelling_mistake(expected, &blank.entered_text, policy)),
            None,
        ),
    };

    Some(Feedback {
        blank: blank.id.clone(),
        kind,
        text,
        mistake,
        highlight,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PolicyOverrides, SpellingErrorBehaviour};

    fn outcome(alternative: &str, correctness: Correctness, set: usize) -> MatchOutcome {
        MatchOutcome {
            correctness,
            alternative: alternative.to_string(),
            distance: if correctness == Correctness::ExactMatch { 0 } else { 1 },
            answer_set: Some(set),
        }
    }

    fn policy_with(spelling: SpellingErrorBehaviour, use_regex: bool) -> MatchingPolicy {
        MatchingPolicy::default().merge(&PolicyOverrides {
            spelling: Some(spelling),
            use_regex: Some(use_regex),
            ..PolicyOverrides::default()
        })
    }

    #[test]
    fn exact_correct_wins_over_everything() {
        let c = Candidates {
            exact_correct: Some(outcome("Paris", Correctness::ExactMatch, 0)),
            exact_incorrect: Some(outcome("paris", Correctness::ExactMatch, 0)),
            ..Candidates::default()
        };
        let (rule, verdict) = decide(&c, &MatchingPolicy::default());
        assert_eq!(rule, "exact_correct");
        assert_eq!(verdict.state, AnswerState::Correct);
        assert_eq!(verdict.canonical_text.as_deref(), Some("Paris"));
    }

    #[test]
    fn catch_all_downgrades_to_retry_in_regex_mode() {
        let c = Candidates {
            close_correct: Some(outcome("necessary", Correctness::CloseMatch, 0)),
            exact_incorrect: Some(outcome(".*", Correctness::ExactMatch, 2)),
            exact_incorrect_lead: Some(".*".to_string()),
            ..Candidates::default()
        };
        let (_, verdict) = decide(&c, &policy_with(SpellingErrorBehaviour::Warn, true));
        assert_eq!(verdict.state, AnswerState::Retry);

        // Without regex mode the catch-all is a plain incorrect answer.
        let (_, verdict) = decide(&c, &policy_with(SpellingErrorBehaviour::Warn, false));
        assert_eq!(verdict.state, AnswerState::Error);
        assert_eq!(verdict.feedback, Some(FeedbackSource::IncorrectAnswer(2)));
    }

    #[test]
    fn other_patterns_do_not_downgrade() {
        let c = Candidates {
            close_correct: Some(outcome("necessary", Correctness::CloseMatch, 0)),
            exact_incorrect: Some(outcome(".+", Correctness::ExactMatch, 0)),
            exact_incorrect_lead: Some(".+".to_string()),
            ..Candidates::default()
        };
        let (_, verdict) = decide(&c, &policy_with(SpellingErrorBehaviour::Warn, true));
        assert_eq!(verdict.state, AnswerState::Error);
    }

    #[test]
    fn close_correct_follows_spelling_behaviour() {
        let c = Candidates {
            close_correct: Some(outcome("necessary", Correctness::CloseMatch, 0)),
            ..Candidates::default()
        };

        let (_, verdict) = decide(&c, &policy_with(SpellingErrorBehaviour::Warn, false));
        assert_eq!(verdict.state, AnswerState::Retry);

        let (_, verdict) = decide(&c, &policy_with(SpellingErrorBehaviour::Accept, false));
        assert_eq!(verdict.state, AnswerState::Correct);
        assert_eq!(verdict.canonical_text.as_deref(), Some("necessary"));

        let (rule, verdict) = decide(&c, &policy_with(SpellingErrorBehaviour::Off, false));
        assert_eq!(rule, "no_match");
        assert_eq!(verdict.state, AnswerState::Error);
    }

    #[test]
    fn close_incorrect_before_always_applying() {
        let c = Candidates {
            close_incorrect: Some(outcome("Lyon", Correctness::CloseMatch, 1)),
            always_applying: Some(0),
            ..Candidates::default()
        };
        let (rule, verdict) = decide(&c, &MatchingPolicy::default());
        assert_eq!(rule, "close_incorrect");
        assert_eq!(verdict.feedback, Some(FeedbackSource::IncorrectAnswer(1)));
    }

    #[test]
    fn always_applying_is_the_fallback_message() {
        let c = Candidates {
            always_applying: Some(3),
            ..Candidates::default()
        };
        let (rule, verdict) = decide(&c, &MatchingPolicy::default());
        assert_eq!(rule, "always_applying");
        assert_eq!(verdict.feedback, Some(FeedbackSource::IncorrectAnswer(3)));
    }

    #[test]
    fn nothing_matched_is_a_plain_error() {
        let (rule, verdict) = decide(&Candidates::default(), &MatchingPolicy::default());
        assert_eq!(rule, "no_match");
        assert_eq!(verdict, Verdict::error(None));
    }
}
