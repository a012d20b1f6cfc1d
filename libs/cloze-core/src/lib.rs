//! Core library for fill-in-the-blank (cloze) exercises.
//!
//! Provides:
//! - Marker normalization and validation for authored passages
//! - Tokenizer turning a passage into anchors, highlights and blanks
//! - Bracket validation for regular expression answers
//! - Answer matching (exact, pattern, spelling tolerance via character diff)
//! - The per-blank evaluation state machine and the exercise aggregate

pub mod blank;
pub mod brackets;
pub mod cloze;
pub mod error;
pub mod evaluator;
pub mod loader;
pub mod markers;
pub mod matching;
pub mod tokenizer;
pub mod types;

pub use blank::Blank;
pub use brackets::validate_regex_brackets;
pub use cloze::Cloze;
pub use error::{ClozeError, Result, UnbalancedBlank};
pub use evaluator::{Evaluation, Feedback};
pub use loader::{BlankDefinition, ExerciseDefinition, IncorrectAnswerDefinition, Snippet};
pub use markers::{normalize_and_validate, NormalizedPassage};
pub use matching::{
    evaluate, render_mistake_markup, spelling_mistake, Correctness, DiffSegment, DiffType, MatchOutcome,
    MatchPass,
};
pub use tokenizer::{tokenize, ParsedPassage};
pub use types::{
    Alternative, AlternativeKind, AnswerSet, AnswerState, Behaviour, BlankId, ClozeElement, ClozeType,
    Highlight, HighlightId, MatchingPolicy, Message, MessageType, PolicyOverrides, SelectAlternatives,
    SpellingErrorBehaviour,
};
