//! Error types for cloze-core.

use thiserror::Error;

/// Result type alias using ClozeError.
pub type Result<T> = std::result::Result<T, ClozeError>;

/// Alternatives of one authored blank whose brackets do not balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnbalancedBlank {
    /// 1-based position of the blank in the authored list.
    pub blank_number: usize,
    pub alternatives: Vec<String>,
}

/// Errors raised while loading an exercise or addressing its blanks.
///
/// Authoring errors are detected once at load time; evaluating an answer
/// never fails.
#[derive(Debug, Error)]
pub enum ClozeError {
    #[error("round or square brackets are not correctly balanced in {} blank(s)", .0.len())]
    UnbalancedBrackets(Vec<UnbalancedBlank>),

    #[error("{count} highlight marker(s) are not paired")]
    UnbalancedHighlightMarkers { count: usize, passage: String },

    #[error("unknown blank {0}")]
    UnknownBlank(String),
}

impl ClozeError {
    /// Human readable listing of the offending expressions, one per line.
    pub fn details(&self) -> String {
        match self {
            Self::UnbalancedBrackets(blanks) => blanks
                .iter()
                .map(|b| format!("Blank # {}\n{}", b.blank_number, b.alternatives.join("\n")))
                .collect::<Vec<_>>()
                .join("\n"),
            Self::UnbalancedHighlightMarkers { passage, .. } => passage.clone(),
            Self::UnknownBlank(id) => id.clone(),
        }
    }
}
