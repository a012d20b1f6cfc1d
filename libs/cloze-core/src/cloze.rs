//! The exercise: parsed passage plus the blanks and highlights it owns.

use crate::blank::Blank;
use crate::error::{ClozeError, Result};
use crate::evaluator::{Evaluation, Feedback};
use crate::loader::{build_blanks, ExerciseDefinition};
use crate::matching::{best_match, Correctness, MatchPass};
use crate::markers::normalize_and_validate;
use crate::tokenizer::tokenize;
use crate::types::{BlankId, ClozeElement, ClozeType, Highlight, HighlightId, MatchingPolicy, SelectAlternatives};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A loaded cloze exercise.
///
/// Blanks and highlights live in arenas owned by the cloze and are addressed
/// by id; the presentation layer reads them between interactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cloze {
    pub html: String,
    pub elements: Vec<ClozeElement>,
    highlights: Vec<Highlight>,
    blanks: Vec<Blank>,
    policy: MatchingPolicy,
}

impl Cloze {
    /// Load an exercise as authored.
    pub fn from_definition(definition: &ExerciseDefinition) -> Result<Self> {
        let policy = MatchingPolicy::from_behaviour(&definition.behaviour);
        Self::with_policy(definition, policy)
    }

    /// Load an exercise with an explicit policy, e.g. one with overrides
    /// merged in.
    pub fn with_policy(definition: &ExerciseDefinition, policy: MatchingPolicy) -> Result<Self> {
        Self::with_policy_and_rng(definition, policy, &mut rand::thread_rng())
    }

    /// Load an exercise, shuffling select-mode choices with `rng`.
    pub fn with_policy_and_rng<R: Rng + ?Sized>(
        definition: &ExerciseDefinition,
        policy: MatchingPolicy,
        rng: &mut R,
    ) -> Result<Self> {
        let blanks = build_blanks(definition, &policy)?;
        let mut cloze = Self::build(&definition.text, blanks, policy)?;
        cloze.load_choices(rng);
        Ok(cloze)
    }

    /// Normalize and tokenize `passage`, attaching `blanks` in order.
    pub fn build(passage: &str, blanks: Vec<Blank>, policy: MatchingPolicy) -> Result<Self> {
        let normalized = normalize_and_validate(passage);
        if normalized.has_marker_error {
            return Err(ClozeError::UnbalancedHighlightMarkers {
                count: normalized.unpaired_markers,
                passage: normalized.passage,
            });
        }

        let parsed = tokenize(&normalized.passage, blanks);
        tracing::debug!(
            blanks = parsed.blanks.len(),
            highlights = parsed.highlights.len(),
            "built cloze"
        );

        Ok(Self {
            html: parsed.html,
            elements: parsed.elements,
            highlights: parsed.highlights,
            blanks: parsed.blanks,
            policy,
        })
    }

    /// Fill the choices of every blank when in select mode.
    pub fn load_choices<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.policy.cloze_type != ClozeType::Select {
            return;
        }

        match self.policy.select_alternatives {
            SelectAlternatives::Alternatives => {
                for blank in self.blanks.iter_mut() {
                    blank.load_choices_from_own_alternatives(rng);
                }
            }
            SelectAlternatives::All => {
                let answers: Vec<Vec<String>> = self.correct_answer_list();
                let restriction = self.policy.select_alternative_restriction;
                for (index, blank) in self.blanks.iter_mut().enumerate() {
                    let others: Vec<String> = answers
                        .iter()
                        .enumerate()
                        .filter(|(other, _)| *other != index)
                        .flat_map(|(_, texts)| texts.iter().cloned())
                        .collect();
                    blank.load_choices_from_other_blanks(&others, restriction, rng);
                }
            }
        }
    }

    pub fn policy(&self) -> &MatchingPolicy {
        &self.policy
    }

    pub fn blanks(&self) -> &[Blank] {
        &self.blanks
    }

    pub fn highlights(&self) -> &[Highlight] {
        &self.highlights
    }

    pub fn blank(&self, id: &BlankId) -> Result<&Blank> {
        self.blanks
            .iter()
            .find(|b| b.id == *id)
            .ok_or_else(|| ClozeError::UnknownBlank(id.to_string()))
    }

    fn blank_mut(&mut self, id: &BlankId) -> Result<&mut Blank> {
        self.blanks
            .iter_mut()
            .find(|b| b.id == *id)
            .ok_or_else(|| ClozeError::UnknownBlank(id.to_string()))
    }

    pub fn highlight(&self, id: HighlightId) -> Option<&Highlight> {
        self.highlights.get(id.0)
    }

    /// After a re-evaluation only the highlight its feedback points at stays
    /// active.
    fn refresh_highlights(&mut self, evaluation: &Evaluation) {
        if let Evaluation::Evaluated { feedback, .. } = evaluation {
            self.hide_all_highlights();
            self.activate(feedback.as_ref());
        }
    }

    fn activate(&mut self, feedback: Option<&Feedback>) {
        if let Some(highlight) = feedback
            .and_then(|f| f.highlight)
            .and_then(|id| self.highlights.get_mut(id.0))
        {
            highlight.active = true;
        }
    }

    /// The learner typed into a blank.
    pub fn enter_text(&mut self, id: &BlankId, text: &str) -> Result<()> {
        self.blank_mut(id)?.on_typed(text);
        Ok(())
    }

    /// Evaluate `learner_text` for a blank.
    ///
    /// Text that differs from what the blank holds counts as typing first.
    /// Unchanged text is not evaluated again unless `force_recheck` is set or
    /// feedback is pending.
    pub fn evaluate(
        &mut self,
        id: &BlankId,
        learner_text: &str,
        suppress_feedback: bool,
        force_recheck: bool,
    ) -> Result<Evaluation> {
        let policy = self.policy.clone();
        let blank = self.blank_mut(id)?;
        if blank.entered_text != learner_text {
            blank.on_typed(learner_text);
        }
        let evaluation = blank.evaluate_attempt(&policy, suppress_feedback, force_recheck);
        self.hide_all_highlights();
        self.activate(evaluation.feedback());
        Ok(evaluation)
    }

    /// Check a blank on blur, change or Enter. Only runs with auto check on
    /// and text in the blank.
    pub fn check_blank(&mut self, id: &BlankId) -> Result<Evaluation> {
        let policy = self.policy.clone();
        let blank = self.blank_mut(id)?;
        if !policy.auto_check || blank.entered_text.is_empty() {
            return Ok(Evaluation::Unchanged);
        }
        let evaluation = blank.evaluate_attempt(&policy, false, false);
        self.hide_all_highlights();
        self.activate(evaluation.feedback());
        Ok(evaluation)
    }

    /// The first blank after `id` that is not correct yet, for moving on
    /// after Enter.
    pub fn next_open_blank(&self, id: &BlankId) -> Option<&BlankId> {
        let position = self.blanks.iter().position(|b| b.id == *id)?;
        self.blanks[position + 1..]
            .iter()
            .find(|b| !b.is_correct())
            .map(|b| &b.id)
    }

    /// Check every blank that holds text and is not yet correct. Feedback is
    /// kept pending.
    pub fn check_all(&mut self) {
        self.hide_all_highlights();
        let policy = self.policy.clone();
        for blank in self
            .blanks
            .iter_mut()
            .filter(|b| !b.is_correct() && !b.entered_text.is_empty())
        {
            blank.evaluate_attempt(&policy, true, true);
        }
    }

    /// The blank got focus.
    pub fn focus(&mut self, id: &BlankId) -> Result<Evaluation> {
        let policy = self.policy.clone();
        let evaluation = self.blank_mut(id)?.on_focused(&policy);
        self.refresh_highlights(&evaluation);
        Ok(evaluation)
    }

    /// Show feedback that was kept pending for a blank.
    pub fn display_feedback(&mut self, id: &BlankId) -> Result<Evaluation> {
        let policy = self.policy.clone();
        let evaluation = self.blank_mut(id)?.display_feedback(&policy);
        self.refresh_highlights(&evaluation);
        Ok(evaluation)
    }

    /// Show a blank's hint, activating its highlight.
    pub fn show_hint(&mut self, id: &BlankId) -> Result<Option<Feedback>> {
        self.hide_all_highlights();
        let hint = self.blank(id)?.show_hint();
        self.activate(hint.as_ref());
        Ok(hint)
    }

    pub fn show_solutions(&mut self) {
        let policy = self.policy.clone();
        for blank in self.blanks.iter_mut() {
            blank.show_solution(&policy);
        }
        self.hide_all_highlights();
    }

    pub fn hide_all_highlights(&mut self) {
        for highlight in self.highlights.iter_mut() {
            highlight.active = false;
        }
    }

    pub fn reset(&mut self) {
        self.hide_all_highlights();
        for blank in self.blanks.iter_mut() {
            blank.reset();
        }
    }

    pub fn is_solved(&self) -> bool {
        self.blanks.iter().all(Blank::is_correct)
    }

    pub fn max_score(&self) -> usize {
        self.blanks.len()
    }

    /// Blanks holding a correct answer that was not filled in by showing
    /// solutions. Spelling mistakes count when they are accepted.
    pub fn current_score(&self) -> usize {
        self.blanks
            .iter()
            .filter(|b| !b.is_showing_solution())
            .filter(|b| {
                let correct = std::slice::from_ref(&b.correct);
                let exact = best_match(
                    correct,
                    &b.entered_text,
                    &self.policy,
                    MatchPass::Strict,
                    Correctness::ExactMatch,
                )
                .is_some();
                let similar = self.policy.accept_spelling_errors()
                    && best_match(
                        correct,
                        &b.entered_text,
                        &self.policy,
                        MatchPass::Spelling,
                        Correctness::CloseMatch,
                    )
                    .is_some();
                exact || similar
            })
            .count()
    }

    /// Every blank has been evaluated to a verdict.
    pub fn all_blanks_entered(&self) -> bool {
        self.blanks
            .iter()
            .all(|b| b.is_error() || b.is_correct() || b.is_retry())
    }

    pub fn is_filled_out(&self) -> bool {
        self.blanks.is_empty() || self.blanks.iter().any(|b| !b.entered_text.is_empty())
    }

    pub fn is_fully_filled_out(&self) -> bool {
        self.blanks.iter().all(|b| !b.entered_text.is_empty())
    }

    /// Whether any blank accepts more than one answer.
    pub fn has_alternatives(&self) -> bool {
        self.blanks.iter().any(|b| b.correct.alternatives.len() > 1)
    }

    pub fn correct_answer_list(&self) -> Vec<Vec<String>> {
        self.blanks.iter().map(Blank::correct_answers).collect()
    }

    pub fn choices(&self, id: &BlankId) -> Result<&[String]> {
        Ok(self.blank(id)?.choices())
    }

    /// Entered text of every blank, in passage order.
    pub fn serialize(&self) -> Vec<String> {
        self.blanks.iter().map(Blank::serialize).collect()
    }

    /// Restore entered text; extra entries are ignored.
    pub fn deserialize(&mut self, data: &[String]) {
        for (blank, text) in self.blanks.iter_mut().zip(data) {
            blank.deserialize(text);
        }
    }
}
