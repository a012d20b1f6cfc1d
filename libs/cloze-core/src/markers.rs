//! Marker normalization for authored passages.
//!
//! Two marker forms are canonical:
//! - `___` marks a blank,
//! - `[[text]]` marks a highlight (at most 40 characters on one line).
//!
//! Authors may also write longer underscore runs and the legacy `!!text!!`
//! highlight form; both are rewritten here before tokenization.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Canonical blank marker.
pub const BLANK_MARKER: &str = "___";
pub const HIGHLIGHT_OPEN: &str = "[[";
pub const HIGHLIGHT_CLOSE: &str = "]]";
const LEGACY_HIGHLIGHT: &str = "!!";

/// A canonical highlight pair, capturing the enclosed text.
pub(crate) static HIGHLIGHT_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[(.{1,40}?)\]\]").expect("highlight pair regex"));

static HIGHLIGHT_MARKERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\[(.{1,40}?)\]\]|\[\[|\]\]").expect("highlight marker regex")
});

static UNDERSCORE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{3,}").expect("underscore regex"));

/// Passage after normalization, with the marker check result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedPassage {
    pub passage: String,
    pub has_marker_error: bool,
    pub unpaired_markers: usize,
}

/// Collapse every run of three or more underscores into [`BLANK_MARKER`].
pub fn normalize_blank_markers(passage: &str) -> String {
    UNDERSCORE_RUN.replace_all(passage, BLANK_MARKER).into_owned()
}

/// Rewrite legacy `!!` markers, alternating between an opening and a closing
/// highlight marker.
///
/// The toggle is positional; an odd number of `!!` leaves the last one
/// unpaired, which [`check_balanced_highlight_markers`] reports.
pub fn replace_double_exclamations(passage: &str) -> String {
    let mut result = String::with_capacity(passage.len());
    let mut rest = passage;
    let mut opening = true;

    while let Some(pos) = rest.find(LEGACY_HIGHLIGHT) {
        result.push_str(&rest[..pos]);
        result.push_str(if opening { HIGHLIGHT_OPEN } else { HIGHLIGHT_CLOSE });
        opening = !opening;
        rest = &rest[pos + LEGACY_HIGHLIGHT.len()..];
    }
    result.push_str(rest);
    result
}

/// Wrap every unpaired highlight marker so it shows up in the passage.
///
/// Returns the rewritten passage and the number of unpaired markers; zero
/// means every marker belongs to a pair.
pub fn check_balanced_highlight_markers(passage: &str) -> (String, usize) {
    let mut unpaired = 0;
    let marked = HIGHLIGHT_MARKERS.replace_all(passage, |caps: &regex::Captures| {
        let whole = &caps[0];
        if caps.get(1).is_some() {
            whole.to_string()
        } else {
            unpaired += 1;
            format!("<span class=\"unpaired-marker\">{}</span>", whole)
        }
    });
    (marked.into_owned(), unpaired)
}

/// Normalize both marker forms, then check highlight pairing.
///
/// The returned passage only has unpaired markers wrapped when the check
/// failed; a balanced passage comes back exactly as normalized.
pub fn normalize_and_validate(passage: &str) -> NormalizedPassage {
    let normalized = normalize_blank_markers(&replace_double_exclamations(passage));
    let (marked, unpaired_markers) = check_balanced_highlight_markers(&normalized);

    if unpaired_markers > 0 {
        tracing::warn!(unpaired_markers, "passage has unpaired highlight markers");
        NormalizedPassage {
            passage: marked,
            has_marker_error: true,
            unpaired_markers,
        }
    } else {
        NormalizedPassage {
            passage: normalized,
            has_marker_error: false,
            unpaired_markers: 0,
        }
    }
}
