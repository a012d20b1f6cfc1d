//! Core types for cloze exercises.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a blank, `cloze{n}` where `n` is the authored index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlankId(pub String);

impl BlankId {
    pub fn from_index(index: usize) -> Self {
        Self(format!("cloze{}", index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sequential highlight identifier assigned by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HighlightId(pub usize);

impl fmt::Display for HighlightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "highlight_{}", self.0)
    }
}

/// How an alternative's text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlternativeKind {
    Literal,
    Pattern,
}

/// One accepted or rejected answer string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alternative {
    pub text: String,
    pub kind: AlternativeKind,
}

impl Alternative {
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: AlternativeKind::Literal,
        }
    }

    pub fn pattern(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: AlternativeKind::Pattern,
        }
    }

    /// Tag `text` according to whether regex mode is on.
    pub fn with_mode(text: impl Into<String>, use_regex: bool) -> Self {
        if use_regex {
            Self::pattern(text)
        } else {
            Self::literal(text)
        }
    }
}

/// A feedback text that may point at a highlight in the passage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    /// Relative position as authored: `-1` is the nearest highlight before the
    /// blank, `+1` the nearest one after it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_position: Option<i32>,
    /// Resolved by the tokenizer's linking pass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<HighlightId>,
}

impl Message {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            highlight_position: None,
            highlight: None,
        }
    }

    pub fn with_highlight_position(mut self, position: i32) -> Self {
        self.highlight_position = Some(position);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Ordered alternatives that share one feedback message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSet {
    pub alternatives: Vec<Alternative>,
    pub message: Message,
    /// Set for incorrect answers authored without text: their message is the
    /// fallback for any wrong answer.
    pub applies_always: bool,
}

impl AnswerSet {
    pub fn new(alternatives: Vec<Alternative>, message: Message) -> Self {
        let applies_always = alternatives.is_empty();
        Self {
            alternatives,
            message,
            applies_always,
        }
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.alternatives.iter().map(|a| a.text.as_str())
    }
}

/// A passage region that can be emphasised when a blank is answered wrongly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub id: HighlightId,
    pub text: String,
    pub active: bool,
}

impl Highlight {
    pub fn new(id: HighlightId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            active: false,
        }
    }
}

/// An interactive element of the passage, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ClozeElement {
    Highlight(HighlightId),
    Blank(BlankId),
}

/// Answer state of a blank. Exactly one variant holds at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerState {
    #[default]
    Unevaluated,
    Correct,
    Error,
    Retry,
    ShowingSolution,
}

/// Severity of a feedback request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Correct,
    Error,
    Retry,
}

/// Whether blanks are typed in or chosen from a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClozeType {
    #[default]
    Type,
    Select,
}

/// Where select-mode choices come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectAlternatives {
    /// Correct answers of every blank in the exercise.
    All,
    /// The blank's own correct and incorrect alternatives.
    #[default]
    Alternatives,
}

/// What to do with answers that are a few characters off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellingErrorBehaviour {
    Off,
    #[default]
    Warn,
    Accept,
}

/// Authored behaviour settings, as stored with the exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Behaviour {
    pub mode: ClozeType,
    pub case_sensitive: bool,
    pub use_regex: bool,
    pub spelling_error_behaviour: SpellingErrorBehaviour,
    pub show_all_solutions: bool,
    pub auto_check: bool,
    pub select_alternatives: SelectAlternatives,
    /// Maximum number of choices per blank in select mode; 0 means no limit.
    pub select_alternative_restriction: usize,
}

impl Default for Behaviour {
    fn default() -> Self {
        Self {
            mode: ClozeType::Type,
            case_sensitive: false,
            use_regex: false,
            spelling_error_behaviour: SpellingErrorBehaviour::Warn,
            show_all_solutions: false,
            auto_check: false,
            select_alternatives: SelectAlternatives::Alternatives,
            select_alternative_restriction: 5,
        }
    }
}

/// Matching rules in effect while evaluating answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingPolicy {
    pub cloze_type: ClozeType,
    pub case_sensitive: bool,
    pub use_regex: bool,
    pub spelling: SpellingErrorBehaviour,
    pub show_all_solutions: bool,
    /// Check a blank as soon as it loses focus or changes.
    pub auto_check: bool,
    pub select_alternatives: SelectAlternatives,
    pub select_alternative_restriction: usize,
    /// One extra tolerated edit per this many characters of the alternative.
    pub typo_divisor: usize,
}

impl Default for MatchingPolicy {
    fn default() -> Self {
        Self::from_behaviour(&Behaviour::default())
    }
}

impl MatchingPolicy {
    /// Derive the effective policy, dropping combinations that make no sense
    /// for the selected mode.
    pub fn from_behaviour(behaviour: &Behaviour) -> Self {
        let mut policy = Self {
            cloze_type: behaviour.mode,
            case_sensitive: behaviour.case_sensitive,
            use_regex: behaviour.use_regex,
            spelling: behaviour.spelling_error_behaviour,
            show_all_solutions: behaviour.show_all_solutions,
            auto_check: behaviour.auto_check,
            select_alternatives: behaviour.select_alternatives,
            select_alternative_restriction: behaviour.select_alternative_restriction,
            typo_divisor: 10,
        };
        policy.enforce_logic();
        policy
    }

    /// Apply optional overrides on top of this policy.
    pub fn merge(&self, overrides: &PolicyOverrides) -> Self {
        let mut policy = Self {
            cloze_type: self.cloze_type,
            case_sensitive: overrides.case_sensitive.unwrap_or(self.case_sensitive),
            use_regex: overrides.use_regex.unwrap_or(self.use_regex),
            spelling: overrides.spelling.unwrap_or(self.spelling),
            show_all_solutions: overrides
                .show_all_solutions
                .unwrap_or(self.show_all_solutions),
            auto_check: self.auto_check,
            select_alternatives: self.select_alternatives,
            select_alternative_restriction: self.select_alternative_restriction,
            typo_divisor: overrides.typo_divisor.unwrap_or(self.typo_divisor).max(1),
        };
        policy.enforce_logic();
        policy
    }

    fn enforce_logic(&mut self) {
        match self.cloze_type {
            ClozeType::Type => {
                self.select_alternatives = SelectAlternatives::All;
                self.select_alternative_restriction = 0;
                if self.use_regex && self.spelling == SpellingErrorBehaviour::Accept {
                    self.spelling = SpellingErrorBehaviour::Off;
                }
            }
            ClozeType::Select => {
                if self.select_alternatives == SelectAlternatives::Alternatives {
                    self.select_alternative_restriction = 0;
                }
                self.spelling = SpellingErrorBehaviour::Off;
                self.case_sensitive = false;
                self.use_regex = false;
                self.show_all_solutions = false;
            }
        }
    }

    pub fn warn_spelling_errors(&self) -> bool {
        self.spelling == SpellingErrorBehaviour::Warn
    }

    pub fn accept_spelling_errors(&self) -> bool {
        self.spelling == SpellingErrorBehaviour::Accept
    }

    /// Number of character edits still counted as a spelling mistake.
    pub fn typo_allowance(&self, alternative: &str) -> usize {
        if self.spelling == SpellingErrorBehaviour::Off {
            return 0;
        }
        alternative.chars().count() / self.typo_divisor.max(1) + 1
    }
}

/// Optional policy overrides (all fields optional).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_regex: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spelling: Option<SpellingErrorBehaviour>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_all_solutions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typo_divisor: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regex_mode_disables_accepting_spelling_errors() {
        let behaviour = Behaviour {
            use_regex: true,
            spelling_error_behaviour: SpellingErrorBehaviour::Accept,
            ..Behaviour::default()
        };
        let policy = MatchingPolicy::from_behaviour(&behaviour);
        assert_eq!(policy.spelling, SpellingErrorBehaviour::Off);
    }

    #[test]
    fn select_mode_turns_off_text_options() {
        let behaviour = Behaviour {
            mode: ClozeType::Select,
            case_sensitive: true,
            use_regex: true,
            show_all_solutions: true,
            ..Behaviour::default()
        };
        let policy = MatchingPolicy::from_behaviour(&behaviour);
        assert!(!policy.case_sensitive);
        assert!(!policy.use_regex);
        assert!(!policy.show_all_solutions);
        assert_eq!(policy.spelling, SpellingErrorBehaviour::Off);
    }

    #[test]
    fn select_restriction_only_applies_to_choices_from_all_blanks() {
        let behaviour = Behaviour {
            mode: ClozeType::Select,
            select_alternative_restriction: 4,
            ..Behaviour::default()
        };
        let policy = MatchingPolicy::from_behaviour(&behaviour);
        assert_eq!(policy.select_alternatives, SelectAlternatives::Alternatives);
        assert_eq!(policy.select_alternative_restriction, 0);

        let policy = MatchingPolicy::from_behaviour(&Behaviour {
            select_alternatives: SelectAlternatives::All,
            ..behaviour
        });
        assert_eq!(policy.select_alternative_restriction, 4);

        // Typed blanks have no choices to restrict.
        let policy = MatchingPolicy::default();
        assert_eq!(policy.select_alternatives, SelectAlternatives::All);
        assert_eq!(policy.select_alternative_restriction, 0);
    }

    #[test]
    fn merge_applies_overrides() {
        let base = MatchingPolicy::default();
        let overrides = PolicyOverrides {
            case_sensitive: Some(true),
            spelling: Some(SpellingErrorBehaviour::Accept),
            ..PolicyOverrides::default()
        };
        let merged = base.merge(&overrides);
        assert!(merged.case_sensitive);
        assert!(merged.accept_spelling_errors());
        assert!(!merged.use_regex);
    }

    #[test]
    fn typo_allowance_grows_with_length() {
        let policy = MatchingPolicy::default();
        assert_eq!(policy.typo_allowance("necessary"), 1);
        assert_eq!(policy.typo_allowance("electroencephalogram"), 3);

        let strict = policy.merge(&PolicyOverrides {
            spelling: Some(SpellingErrorBehaviour::Off),
            ..PolicyOverrides::default()
        });
        assert_eq!(strict.typo_allowance("necessary"), 0);
    }

    #[test]
    fn answer_set_without_alternatives_applies_always() {
        let set = AnswerSet::new(vec![], Message::new("Think again"));
        assert!(set.applies_always);
        let set = AnswerSet::new(vec![Alternative::literal("Rome")], Message::default());
        assert!(!set.applies_always);
    }

    #[test]
    fn ids_display() {
        assert_eq!(BlankId::from_index(3).to_string(), "cloze3");
        assert_eq!(HighlightId(0).to_string(), "highlight_0");
    }
}
