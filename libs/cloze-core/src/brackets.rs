//! Bracket balance check for alternatives that will be compiled as regular
//! expressions.
//!
//! Unbalanced brackets do not always make a pattern fail to compile (`a)b`
//! can still be read as something), so this check runs before compilation.

#[derive(Debug, Default)]
struct Counters {
    parens_open: usize,
    parens_close: usize,
    brackets_open: usize,
    brackets_close: usize,
}

impl Counters {
    fn is_balanced(&self) -> bool {
        self.parens_open == 0
            && self.parens_close == 0
            && self.brackets_open == 0
            && self.brackets_close == 0
    }
}

/// Whether every `(`/`)` and `[`/`]` in `alternative` pairs up.
///
/// A character following a backslash is escaped and not counted.
pub fn is_balanced(alternative: &str) -> bool {
    let mut counters = Counters::default();
    let mut chars = alternative.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '(' => counters.parens_open += 1,
            ')' => {
                if counters.parens_open > 0 {
                    counters.parens_open -= 1;
                } else {
                    counters.parens_close += 1;
                }
            }
            '[' => counters.brackets_open += 1,
            ']' => {
                if counters.brackets_open > 0 {
                    counters.brackets_open -= 1;
                } else {
                    counters.brackets_close += 1;
                }
            }
            _ => {}
        }
    }

    counters.is_balanced()
}

/// Return the alternatives whose brackets do not balance, or `None` if all do.
pub fn validate_regex_brackets<I, S>(alternatives: I) -> Option<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let unbalanced: Vec<String> = alternatives
        .into_iter()
        .filter(|a| !a.as_ref().is_empty() && !is_balanced(a.as_ref()))
        .map(|a| a.as_ref().to_string())
        .collect();

    if unbalanced.is_empty() {
        None
    } else {
        Some(unbalanced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_parens() {
        assert!(is_balanced("a(b)"));
        assert!(is_balanced("colou?r"));
        assert!(is_balanced("[a-z]+(s|es)?"));
    }

    #[test]
    fn surplus_opener_is_unbalanced() {
        assert!(!is_balanced("a(b"));
        assert!(!is_balanced("[abc"));
    }

    #[test]
    fn closer_before_opener_is_unbalanced() {
        // Counts match, but the closer comes first.
        assert!(!is_balanced("a)b("));
        assert!(!is_balanced("]x["));
    }

    #[test]
    fn escaped_brackets_are_ignored() {
        assert!(is_balanced(r"a\(b"));
        assert!(is_balanced(r"\[\]\)"));
        assert!(!is_balanced(r"\\(b"));
    }

    #[test]
    fn validate_returns_none_when_all_balanced() {
        assert_eq!(validate_regex_brackets(["a(b)", "[xy]", ".*"]), None);
    }

    #[test]
    fn validate_returns_unbalanced_subset_in_order() {
        let result = validate_regex_brackets(vec!["ok", "a(b", "fine", "a)b("]);
        assert_eq!(result, Some(vec!["a(b".to_string(), "a)b(".to_string()]));
    }
}
