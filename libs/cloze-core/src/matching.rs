//! Answer matching against authored alternatives.

use crate::types::{Alternative, AlternativeKind, AnswerSet, MatchingPolicy};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use similar::{Algorithm, ChangeTag, TextDiff};

/// How close a learner's text is to one alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Correctness {
    ExactMatch,
    CloseMatch,
    NoMatch,
}

/// Which reading of pattern alternatives to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPass {
    /// Patterns are compiled and must match the whole text.
    Strict,
    /// Every alternative is read literally, so spelling mistakes can be
    /// measured against pattern sources too.
    Spelling,
}

/// Result of comparing a learner's text to an alternative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub correctness: Correctness,
    /// The alternative as authored.
    pub alternative: String,
    /// Number of edited characters; lower is closer.
    pub distance: usize,
    /// Index of the answer set the alternative came from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_set: Option<usize>,
}

/// Compare `learner_text` to one alternative.
pub fn evaluate(
    alternative: &Alternative,
    learner_text: &str,
    policy: &MatchingPolicy,
    pass: MatchPass,
) -> MatchOutcome {
    let attempt = normalize_whitespace(learner_text);

    // Whitespace inside a pattern is part of the expression.
    let (correctness, distance) =
        if alternative.kind == AlternativeKind::Pattern && pass == MatchPass::Strict {
            match_pattern(&alternative.text, &attempt, policy)
        } else {
            match_literal(&normalize_whitespace(&alternative.text), &attempt, policy)
        };

    MatchOutcome {
        correctness,
        alternative: alternative.text.clone(),
        distance,
        answer_set: None,
    }
}

/// Best match of the wanted classification across `sets`.
///
/// The lowest distance wins; on equal distance the first alternative in
/// authoring order is kept.
pub fn best_match(
    sets: &[AnswerSet],
    learner_text: &str,
    policy: &MatchingPolicy,
    pass: MatchPass,
    wanted: Correctness,
) -> Option<MatchOutcome> {
    sets.iter()
        .enumerate()
        .flat_map(|(index, set)| {
            set.alternatives.iter().map(move |alternative| {
                let mut outcome = evaluate(alternative, learner_text, policy, pass);
                outcome.answer_set = Some(index);
                outcome
            })
        })
        .filter(|outcome| outcome.correctness == wanted)
        .min_by_key(|outcome| outcome.distance)
}

fn match_pattern(source: &str, attempt: &str, policy: &MatchingPolicy) -> (Correctness, usize) {
    let anchored = format!("^(?:{})$", source);
    match RegexBuilder::new(&anchored)
        .case_insensitive(!policy.case_sensitive)
        .build()
    {
        Ok(regex) if regex.is_match(attempt) => (Correctness::ExactMatch, 0),
        Ok(_) => (Correctness::NoMatch, attempt.chars().count()),
        Err(err) => {
            tracing::warn!(pattern = source, error = %err, "alternative is not a valid pattern");
            (Correctness::NoMatch, attempt.chars().count())
        }
    }
}

fn match_literal(expected: &str, attempt: &str, policy: &MatchingPolicy) -> (Correctness, usize) {
    if fold_case(expected, policy) == fold_case(attempt, policy) {
        return (Correctness::ExactMatch, 0);
    }

    let distance = change_count(&diff_runs(expected, attempt, policy));
    if !attempt.is_empty() && distance <= policy.typo_allowance(expected) {
        (Correctness::CloseMatch, distance)
    } else {
        (Correctness::NoMatch, distance)
    }
}

/// Normalize whitespace in a string (trim and collapse multiple spaces).
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Per-character case folding that keeps the character count unchanged, so
/// diff indices map back onto the original text.
fn fold_case(s: &str, policy: &MatchingPolicy) -> String {
    if policy.case_sensitive {
        s.to_string()
    } else {
        s.chars()
            .map(|c| c.to_lowercase().next().unwrap_or(c))
            .collect()
    }
}

/// A run of consecutive changes of the same kind.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DiffRun {
    tag: ChangeTag,
    text: String,
}

/// Character diff from `expected` to `entered`, grouped into runs.
///
/// Equal and inserted runs carry the entered characters, deleted runs the
/// expected ones.
fn diff_runs(expected: &str, entered: &str, policy: &MatchingPolicy) -> Vec<DiffRun> {
    let old_chars: Vec<char> = expected.chars().collect();
    let new_chars: Vec<char> = entered.chars().collect();
    let old_folded = fold_case(expected, policy);
    let new_folded = fold_case(entered, policy);

    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_chars(old_folded.as_str(), new_folded.as_str());

    let mut runs: Vec<DiffRun> = Vec::new();
    for change in diff.iter_all_changes() {
        let c = match change.tag() {
            ChangeTag::Delete => change.old_index().and_then(|i| old_chars.get(i)),
            ChangeTag::Equal | ChangeTag::Insert => {
                change.new_index().and_then(|i| new_chars.get(i))
            }
        };
        let Some(&c) = c else { continue };

        match runs.last_mut() {
            Some(run) if run.tag == change.tag() => run.text.push(c),
            _ => runs.push(DiffRun {
                tag: change.tag(),
                text: c.to_string(),
            }),
        }
    }
    runs
}

fn is_substitution(a: &DiffRun, b: &DiffRun) -> bool {
    matches!(
        (a.tag, b.tag),
        (ChangeTag::Delete, ChangeTag::Insert) | (ChangeTag::Insert, ChangeTag::Delete)
    )
}

/// Count edited characters. A deletion next to an insertion is a
/// substitution and counts the longer of the two.
fn change_count(runs: &[DiffRun]) -> usize {
    let mut total = 0;
    let mut previous: Option<&DiffRun> = None;

    for run in runs {
        let len = run.text.chars().count();
        match (run.tag, previous) {
            (ChangeTag::Equal, _) => {}
            (_, Some(prev)) if is_substitution(prev, run) => {
                total += len.saturating_sub(prev.text.chars().count());
            }
            _ => total += len,
        }
        previous = Some(run);
    }
    total
}

/// Segment kind in a spelling mistake rendering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiffType {
    /// Typed as expected.
    Same,
    /// Typed, but not expected at this position.
    Mistaken,
    /// Expected but left out; shown as underscores.
    Missing,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiffSegment {
    pub text: String,
    pub diff_type: DiffType,
}

/// Describe how `entered` differs from `expected`, character by character.
pub fn spelling_mistake(expected: &str, entered: &str, policy: &MatchingPolicy) -> Vec<DiffSegment> {
    let expected = normalize_whitespace(expected);
    let entered = normalize_whitespace(entered);
    let runs = diff_runs(&expected, &entered, policy);

    let mut segments = Vec::with_capacity(runs.len());
    for (index, run) in runs.iter().enumerate() {
        match run.tag {
            ChangeTag::Equal => segments.push(DiffSegment {
                text: run.text.clone(),
                diff_type: DiffType::Same,
            }),
            ChangeTag::Insert => segments.push(DiffSegment {
                text: run.text.clone(),
                diff_type: DiffType::Mistaken,
            }),
            ChangeTag::Delete => {
                let replaced = runs.get(index + 1).is_some_and(|next| is_substitution(run, next))
                    || index
                        .checked_sub(1)
                        .and_then(|i| runs.get(i))
                        .is_some_and(|prev| is_substitution(prev, run));
                // The replacement is shown as a mistaken segment instead.
                if !replaced {
                    segments.push(DiffSegment {
                        text: "_".repeat(run.text.chars().count()),
                        diff_type: DiffType::Missing,
                    });
                }
            }
        }
    }
    segments
}

/// Render segments as `spelling-mistake` span markup.
pub fn render_mistake_markup(segments: &[DiffSegment]) -> String {
    let mut markup = String::from("<span class=\"spelling-mistake\">");
    for segment in segments {
        let class = match segment.diff_type {
            DiffType::Same => "",
            DiffType::Mistaken => "mistaken-character",
            DiffType::Missing => "missing-character",
        };
        markup.push_str(&format!(
            "<span class=\"{}\">{}</span>",
            class,
            segment.text.replace(' ', "&nbsp;")
        ));
    }
    markup.push_str("</span>");
    markup
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Message, PolicyOverrides, SpellingErrorBehaviour};
    use pretty_assertions::assert_eq;

    fn policy() -> MatchingPolicy {
        MatchingPolicy::default()
    }

    fn strict() -> MatchingPolicy {
        policy().merge(&PolicyOverrides {
            case_sensitive: Some(true),
            ..PolicyOverrides::default()
        })
    }

    #[test]
    fn test_exact_literal_match() {
        let outcome = evaluate(&Alternative::literal("Paris"), "paris", &policy(), MatchPass::Strict);
        assert_eq!(outcome.correctness, Correctness::ExactMatch);
        assert_eq!(outcome.distance, 0);

        let outcome = evaluate(&Alternative::literal("Paris"), "paris", &strict(), MatchPass::Strict);
        assert_ne!(outcome.correctness, Correctness::ExactMatch);
    }

    #[test]
    fn test_whitespace_normalization() {
        let outcome = evaluate(
            &Alternative::literal("hello world"),
            "  hello   world  ",
            &policy(),
            MatchPass::Strict,
        );
        assert_eq!(outcome.correctness, Correctness::ExactMatch);
    }

    #[test]
    fn test_close_literal_match() {
        let outcome = evaluate(
            &Alternative::literal("necessary"),
            "neccessary",
            &policy(),
            MatchPass::Strict,
        );
        assert_eq!(outcome.correctness, Correctness::CloseMatch);
        assert_eq!(outcome.distance, 1);
    }

    #[test]
    fn test_substitution_counts_once() {
        let outcome = evaluate(&Alternative::literal("house"), "hoise", &policy(), MatchPass::Strict);
        assert_eq!(outcome.correctness, Correctness::CloseMatch);
        assert_eq!(outcome.distance, 1);
    }

    #[test]
    fn test_far_literal_is_no_match() {
        let outcome = evaluate(&Alternative::literal("Paris"), "Berlin", &policy(), MatchPass::Strict);
        assert_eq!(outcome.correctness, Correctness::NoMatch);
    }

    #[test]
    fn test_spelling_off_disables_close_match() {
        let off = policy().merge(&PolicyOverrides {
            spelling: Some(SpellingErrorBehaviour::Off),
            ..PolicyOverrides::default()
        });
        let outcome = evaluate(&Alternative::literal("necessary"), "neccessary", &off, MatchPass::Strict);
        assert_eq!(outcome.correctness, Correctness::NoMatch);
    }

    #[test]
    fn test_empty_attempt_is_never_close() {
        let outcome = evaluate(&Alternative::literal("a"), "", &policy(), MatchPass::Strict);
        assert_eq!(outcome.correctness, Correctness::NoMatch);
    }

    #[test]
    fn test_pattern_matches_whole_text_only() {
        let alternative = Alternative::pattern("colou?r");
        let outcome = evaluate(&alternative, "Colour", &policy(), MatchPass::Strict);
        assert_eq!(outcome.correctness, Correctness::ExactMatch);

        let outcome = evaluate(&alternative, "colours", &policy(), MatchPass::Strict);
        assert_eq!(outcome.correctness, Correctness::NoMatch);
    }

    #[test]
    fn test_pattern_never_close() {
        let outcome = evaluate(&Alternative::pattern("necessary"), "neccessary", &policy(), MatchPass::Strict);
        assert_eq!(outcome.correctness, Correctness::NoMatch);

        let outcome = evaluate(&Alternative::pattern("necessary"), "neccessary", &policy(), MatchPass::Spelling);
        assert_eq!(outcome.correctness, Correctness::CloseMatch);
    }

    #[test]
    fn test_pattern_alternation_is_anchored() {
        let outcome = evaluate(&Alternative::pattern("cat|dog"), "cats", &policy(), MatchPass::Strict);
        assert_eq!(outcome.correctness, Correctness::NoMatch);
    }

    #[test]
    fn test_pattern_whitespace_is_kept() {
        // One required space and one optional one.
        let alternative = Alternative::pattern("a  ?b");
        let outcome = evaluate(&alternative, "a b", &policy(), MatchPass::Strict);
        assert_eq!(outcome.correctness, Correctness::ExactMatch);

        let outcome = evaluate(&alternative, "ab", &policy(), MatchPass::Strict);
        assert_eq!(outcome.correctness, Correctness::NoMatch);
    }

    #[test]
    fn test_invalid_pattern_is_no_match() {
        let outcome = evaluate(&Alternative::pattern("*a"), "a", &policy(), MatchPass::Strict);
        assert_eq!(outcome.correctness, Correctness::NoMatch);
    }

    #[test]
    fn test_best_match_prefers_lowest_distance_then_order() {
        let sets = vec![
            AnswerSet::new(
                vec![Alternative::literal("abcdefghij"), Alternative::literal("abcdefghik")],
                Message::default(),
            ),
            AnswerSet::new(vec![Alternative::literal("abcdefghiX")], Message::default()),
        ];
        // One substitution against each alternative.
        let best = best_match(&sets, "abcdefghiz", &policy(), MatchPass::Strict, Correctness::CloseMatch)
            .expect("close match");
        assert_eq!(best.alternative, "abcdefghij");
        assert_eq!(best.answer_set, Some(0));

        let best = best_match(&sets, "abcdefghix", &strict(), MatchPass::Strict, Correctness::CloseMatch)
            .expect("close match");
        assert_eq!(best.alternative, "abcdefghij");

        let best = best_match(&sets, "abcdefghiX", &strict(), MatchPass::Strict, Correctness::ExactMatch)
            .expect("exact match");
        assert_eq!(best.answer_set, Some(1));
    }

    #[test]
    fn test_spelling_mistake_segments() {
        let segments = spelling_mistake("necessary", "neccessary", &policy());
        let mistaken: Vec<_> = segments
            .iter()
            .filter(|s| s.diff_type == DiffType::Mistaken)
            .collect();
        assert_eq!(mistaken.len(), 1);
        assert_eq!(mistaken[0].text, "c");
        let typed: String = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(typed, "neccessary");
    }

    #[test]
    fn test_spelling_mistake_missing_character() {
        let segments = spelling_mistake("house", "hose", &policy());
        assert!(segments
            .iter()
            .any(|s| s.diff_type == DiffType::Missing && s.text == "_"));
    }

    #[test]
    fn test_render_markup() {
        let segments = vec![
            DiffSegment { text: "a b".into(), diff_type: DiffType::Same },
            DiffSegment { text: "x".into(), diff_type: DiffType::Mistaken },
        ];
        assert_eq!(
            render_mistake_markup(&segments),
            "<span class=\"spelling-mistake\"><span class=\"\">a&nbsp;b</span><span class=\"mistaken-character\">x</span></span>"
        );
    }
}
