//! A blank: the unit of interaction in a cloze.

use crate::evaluator::{self, Candidates, Evaluation, Feedback};
use crate::types::{AnswerSet, AnswerState, BlankId, ClozeType, MatchingPolicy, Message, MessageType};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blank {
    pub id: BlankId,
    pub correct: AnswerSet,
    pub incorrect: Vec<AnswerSet>,
    pub hint: Option<Message>,
    pub correct_feedback: Option<String>,
    /// Text currently in the blank, pushed in by the presentation layer.
    pub entered_text: String,
    /// Text as of the last evaluation; unchanged text is not re-evaluated.
    pub last_checked_text: String,
    /// Set when feedback was suppressed and can be shown on request.
    pub has_pending_feedback: bool,
    /// Select-mode choices, led by an empty entry. Empty for typed blanks.
    choices: Vec<String>,
    state: AnswerState,
}

impl Blank {
    pub fn new(id: BlankId, correct: AnswerSet) -> Self {
        Self {
            id,
            correct,
            incorrect: Vec::new(),
            hint: None,
            correct_feedback: None,
            entered_text: String::new(),
            last_checked_text: String::new(),
            has_pending_feedback: false,
            choices: Vec::new(),
            state: AnswerState::Unevaluated,
        }
    }

    pub fn add_incorrect_answer(&mut self, answer: AnswerSet) {
        self.incorrect.push(answer);
    }

    pub fn set_hint(&mut self, hint: Message) {
        self.hint = Some(hint).filter(|h| !h.is_empty());
    }

    pub fn state(&self) -> AnswerState {
        self.state
    }

    pub fn is_correct(&self) -> bool {
        self.state == AnswerState::Correct
    }

    pub fn is_error(&self) -> bool {
        self.state == AnswerState::Error
    }

    pub fn is_retry(&self) -> bool {
        self.state == AnswerState::Retry
    }

    pub fn is_showing_solution(&self) -> bool {
        self.state == AnswerState::ShowingSolution
    }

    pub fn has_hint(&self) -> bool {
        self.hint.is_some()
    }

    /// All correct alternatives in authoring order.
    pub fn correct_answers(&self) -> Vec<String> {
        self.correct.texts().map(str::to_string).collect()
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    fn set_choices<R: Rng + ?Sized>(&mut self, mut choices: Vec<String>, rng: &mut R) {
        choices.shuffle(rng);
        choices.insert(0, String::new());
        self.choices = choices;
    }

    /// Offer every correct and incorrect alternative of this blank.
    pub fn load_choices_from_own_alternatives<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let choices = std::iter::once(&self.correct)
            .chain(self.incorrect.iter())
            .flat_map(|set| set.texts())
            .map(str::to_string)
            .collect();
        self.set_choices(choices, rng);
    }

    /// Offer this blank's correct alternatives plus a random pick of
    /// `other_answers`, up to `restriction` choices in total (0 = all).
    ///
    /// Answers already on offer are skipped and do not count against the
    /// restriction.
    pub fn load_choices_from_other_blanks<R: Rng + ?Sized>(
        &mut self,
        other_answers: &[String],
        restriction: usize,
        rng: &mut R,
    ) {
        let mut choices = self.correct_answers();
        let mut others = other_answers.to_vec();
        others.shuffle(rng);

        let max_choices = if restriction == 0 {
            choices.len() + others.len()
        } else {
            restriction
        };
        let wanted = max_choices.saturating_sub(choices.len());

        let mut added = 0;
        for candidate in others {
            if added >= wanted {
                break;
            }
            if !choices.contains(&candidate) {
                choices.push(candidate);
                added += 1;
            }
        }
        self.set_choices(choices, rng);
    }

    /// The learner typed: forget the previous evaluation.
    pub fn on_typed(&mut self, text: &str) {
        self.entered_text = text.to_string();
        self.last_checked_text.clear();
        self.has_pending_feedback = false;
        self.state = AnswerState::Unevaluated;
    }

    /// Clear entered text and all evaluation state.
    pub fn reset(&mut self) {
        self.entered_text.clear();
        self.last_checked_text.clear();
        self.has_pending_feedback = false;
        self.state = AnswerState::Unevaluated;
    }

    /// Evaluate the entered text.
    ///
    /// Skipped when the text was already evaluated, unless feedback is
    /// pending or `force` is set. With `suppress_feedback` no feedback is
    /// returned; it is marked pending instead.
    pub fn evaluate_attempt(
        &mut self,
        policy: &MatchingPolicy,
        suppress_feedback: bool,
        force: bool,
    ) -> Evaluation {
        if !self.has_pending_feedback && self.last_checked_text == self.entered_text && !force {
            return Evaluation::Unchanged;
        }
        self.has_pending_feedback = false;

        let candidates = Candidates::collect(self, &self.entered_text, policy);
        let (rule, verdict) = evaluator::decide(&candidates, policy);
        tracing::debug!(blank = %self.id, rule, state = ?verdict.state, "evaluated blank");

        self.state = verdict.state;
        let feedback = evaluator::resolve_feedback(self, &verdict, policy);
        if let Some(text) = &verdict.canonical_text {
            self.entered_text = text.clone();
        }
        self.last_checked_text = self.entered_text.clone();

        let feedback = match feedback {
            Some(feedback) if suppress_feedback => {
                // Highlights stay off until the feedback is shown.
                self.has_pending_feedback = feedback.text.is_some() || feedback.mistake.is_some();
                None
            }
            other => other,
        };

        Evaluation::Evaluated {
            state: self.state,
            feedback,
        }
    }

    /// Show the first correct alternative (or all of them) unless the blank is
    /// already correct.
    pub fn show_solution(&mut self, policy: &MatchingPolicy) {
        self.evaluate_attempt(policy, true, false);
        if self.is_correct() {
            return;
        }
        self.has_pending_feedback = false;

        self.entered_text = if policy.show_all_solutions {
            self.correct_answers().join(" | ")
        } else {
            self.correct_answers().into_iter().next().unwrap_or_default()
        };
        self.state = AnswerState::ShowingSolution;
    }

    /// Feedback carrying the hint, if there is one and the blank is still open.
    pub fn show_hint(&self) -> Option<Feedback> {
        if self.is_showing_solution() || self.is_correct() {
            return None;
        }
        let hint = self.hint.as_ref()?;
        Some(Feedback {
            blank: self.id.clone(),
            kind: MessageType::Retry,
            text: Some(hint.text.clone()),
            mistake: None,
            highlight: hint.highlight,
        })
    }

    /// The blank got focus: flush pending feedback. In select mode the
    /// previous verdict is dropped so the next choice is evaluated afresh.
    pub fn on_focused(&mut self, policy: &MatchingPolicy) -> Evaluation {
        let evaluation = if self.has_pending_feedback {
            self.evaluate_attempt(policy, false, false)
        } else {
            Evaluation::Unchanged
        };
        if policy.cloze_type == ClozeType::Select {
            self.state = AnswerState::Unevaluated;
            self.last_checked_text.clear();
        }
        evaluation
    }

    /// Show feedback that was suppressed earlier.
    pub fn display_feedback(&mut self, policy: &MatchingPolicy) -> Evaluation {
        if self.has_pending_feedback {
            self.evaluate_attempt(policy, false, false)
        } else {
            Evaluation::Unchanged
        }
    }

    pub fn serialize(&self) -> String {
        self.entered_text.clone()
    }

    pub fn deserialize(&mut self, data: &str) {
        self.entered_text = data.to_string();
    }
}
