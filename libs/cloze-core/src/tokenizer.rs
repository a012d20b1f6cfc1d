//! Markup tokenizer for normalized passages.
//!
//! # Format
//! ```text
//! The [[capital]] of France is ___. It lies on the ___.
//! ```
//! Each highlight and blank marker is replaced by an empty anchor element the
//! presentation layer attaches its widgets to:
//! - `[[capital]]` becomes `<span id='container_highlight_0'></span>`
//! - the first `___` becomes `<span id='container_cloze0'></span>`

use crate::blank::Blank;
use crate::markers::{BLANK_MARKER, HIGHLIGHT_PAIR};
use crate::types::{ClozeElement, Highlight, HighlightId, Message};
use serde::{Deserialize, Serialize};

/// Anchor for blank markers that have no authored blank.
const INERT_ANCHOR: &str = "<span></span>";

/// Tokenizer output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedPassage {
    /// Passage with every marker replaced by its anchor.
    pub html: String,
    /// Highlights and blanks in document order.
    pub elements: Vec<ClozeElement>,
    pub highlights: Vec<Highlight>,
    pub blanks: Vec<Blank>,
}

enum Next {
    Highlight { start: usize, end: usize, text: String },
    Blank { start: usize },
}

/// Find the next marker in `rest`, preferring a highlight that starts first.
fn next_marker(rest: &str) -> Option<Next> {
    let highlight = HIGHLIGHT_PAIR.captures(rest);
    let blank = rest.find(BLANK_MARKER);

    match (highlight, blank) {
        (Some(caps), blank) => {
            let whole = caps.get(0)?;
            if blank.map_or(true, |b| whole.start() < b) {
                Some(Next::Highlight {
                    start: whole.start(),
                    end: whole.end(),
                    text: caps[1].to_string(),
                })
            } else {
                blank.map(|start| Next::Blank { start })
            }
        }
        (None, Some(start)) => Some(Next::Blank { start }),
        (None, None) => None,
    }
}

/// Replace markers with anchors in a single left-to-right pass.
///
/// Authored blanks are consumed in order, one per blank marker. Surplus
/// markers get an inert anchor; surplus blanks are dropped.
pub fn tokenize(passage: &str, blanks: Vec<Blank>) -> ParsedPassage {
    let authored_count = blanks.len();
    let mut authored = blanks.into_iter();

    let mut html = String::with_capacity(passage.len());
    let mut elements = Vec::new();
    let mut highlights = Vec::new();
    let mut placed: Vec<Blank> = Vec::new();
    let mut surplus_markers = 0;
    let mut rest = passage;

    while let Some(next) = next_marker(rest) {
        match next {
            Next::Highlight { start, end, text } => {
                let id = HighlightId(highlights.len());
                html.push_str(&rest[..start]);
                html.push_str(&format!("<span id='container_{}'></span>", id));
                highlights.push(Highlight::new(id, text));
                elements.push(ClozeElement::Highlight(id));
                rest = &rest[end..];
            }
            Next::Blank { start } => {
                html.push_str(&rest[..start]);
                match authored.next() {
                    Some(blank) => {
                        html.push_str(&format!("<span id='container_{}'></span>", blank.id));
                        elements.push(ClozeElement::Blank(blank.id.clone()));
                        placed.push(blank);
                    }
                    None => {
                        html.push_str(INERT_ANCHOR);
                        surplus_markers += 1;
                    }
                }
                rest = &rest[start + BLANK_MARKER.len()..];
            }
        }
    }
    html.push_str(rest);

    if surplus_markers > 0 {
        tracing::debug!(surplus_markers, "blank markers without an authored blank");
    }
    if placed.len() < authored_count {
        tracing::debug!(
            dropped = authored_count - placed.len(),
            "authored blanks without a marker in the passage"
        );
    }

    link_highlights(&elements, &mut placed);

    ParsedPassage {
        html,
        elements,
        highlights,
        blanks: placed,
    }
}

/// Resolve each message's relative highlight position against the
/// highlights around its blank.
pub fn link_highlights(elements: &[ClozeElement], blanks: &mut [Blank]) {
    for blank in blanks.iter_mut() {
        let Some(index) = elements
            .iter()
            .position(|e| matches!(e, ClozeElement::Blank(id) if *id == blank.id))
        else {
            continue;
        };

        let before: Vec<HighlightId> = elements[..index]
            .iter()
            .rev()
            .filter_map(highlight_id)
            .collect();
        let after: Vec<HighlightId> = elements[index + 1..]
            .iter()
            .filter_map(highlight_id)
            .collect();

        for set in blank.incorrect.iter_mut() {
            resolve(&mut set.message, &before, &after);
        }
        resolve(&mut blank.correct.message, &before, &after);
        if let Some(hint) = blank.hint.as_mut() {
            resolve(hint, &before, &after);
        }
    }
}

fn highlight_id(element: &ClozeElement) -> Option<HighlightId> {
    match element {
        ClozeElement::Highlight(id) => Some(*id),
        ClozeElement::Blank(_) => None,
    }
}

fn resolve(message: &mut Message, before: &[HighlightId], after: &[HighlightId]) {
    message.highlight = match message.highlight_position {
        Some(p) if p < 0 => before.get(p.unsigned_abs() as usize - 1).copied(),
        Some(p) if p > 0 => after.get(p as usize - 1).copied(),
        _ => None,
    };
}
