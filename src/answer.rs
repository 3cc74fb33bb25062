use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Absolute tolerance used when both sides of a comparison are numbers.
pub const NUMERIC_TOLERANCE: f64 = 1e-9;

// comma, slash, or the standalone word "or" in any case
static ANSWER_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i),|/|\bor\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    TryAgain,
}

impl Verdict {
    pub fn message(self) -> &'static str {
        match self {
            Self::Correct => "✅ Correct!",
            Self::TryAgain => "❌ Not quite. Try again.",
        }
    }
}

/// The normalized set of answers accepted for one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcceptedAnswers {
    tokens: BTreeSet<String>,
}

impl AcceptedAnswers {
    /// Split a raw `Answer` field into lowercase, trimmed, non-empty tokens.
    pub fn parse(raw: &str) -> Self {
        let tokens = ANSWER_SPLIT
            .split(raw.trim())
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { tokens }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn is_correct(&self, input: &str) -> bool {
        let user = input.trim().to_lowercase();
        if self.contains(&user) {
            return true;
        }
        let Some(value) = parse_numeric(&user) else {
            return false;
        };
        self.tokens
            .iter()
            .filter_map(|t| parse_numeric(t))
            .any(|a| (a - value).abs() < NUMERIC_TOLERANCE)
    }

    pub fn check(&self, input: &str) -> Verdict {
        if self.is_correct(input) {
            Verdict::Correct
        } else {
            Verdict::TryAgain
        }
    }
}

/// Non-empty and parses to a finite decimal value.
pub fn is_numeric(s: &str) -> bool {
    parse_numeric(s).is_some()
}

fn parse_numeric(s: &str) -> Option<f64> {
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn splits_on_or_keyword() {
        let acc = AcceptedAnswers::parse("42 or 42.0");
        assert_eq!(acc.tokens, set(&["42", "42.0"]));
    }

    #[test]
    fn numeric_tolerance_boundary() {
        let acc = AcceptedAnswers::parse("42 or 42.0");
        assert!(acc.is_correct("42.0000000001"));
        assert!(!acc.is_correct("42.00000001"));
        assert!(acc.is_correct("  42.000 "));
    }

    #[test]
    fn comma_and_case() {
        let acc = AcceptedAnswers::parse("Paris, France");
        assert_eq!(acc.tokens, set(&["paris", "france"]));
        assert!(acc.is_correct("PARIS"));
        assert!(acc.is_correct(" france "));
        assert!(!acc.is_correct("lyon"));
    }

    #[test]
    fn slash_and_mixed_case_or() {
        let acc = AcceptedAnswers::parse("3/three OR Three cards");
        assert_eq!(acc.tokens, set(&["3", "three", "three cards"]));
    }

    #[test]
    fn or_inside_words_is_not_a_delimiter() {
        let acc = AcceptedAnswers::parse("Orange or Forest");
        assert_eq!(acc.tokens, set(&["orange", "forest"]));
        let acc = AcceptedAnswers::parse("Corridor");
        assert_eq!(acc.tokens, set(&["corridor"]));
    }

    #[test]
    fn empty_pieces_are_dropped() {
        let acc = AcceptedAnswers::parse(" , / or ,, ");
        assert!(acc.is_empty());
        assert!(!acc.is_correct(""));
        assert_eq!(acc.check(""), Verdict::TryAgain);
    }

    #[test]
    fn numeric_classification() {
        assert!(is_numeric("1e3"));
        assert!(is_numeric("-0.5"));
        assert!(!is_numeric(""));
        assert!(!is_numeric("inf"));
        assert!(!is_numeric("NaN"));
        assert!(!is_numeric("two"));
    }

    #[test]
    fn text_tokens_never_match_numerically() {
        let acc = AcceptedAnswers::parse("two");
        assert!(!acc.is_correct("2"));
    }

    proptest! {
        #[test]
        fn tokens_are_trimmed_lowercase_and_non_empty(raw in ".{0,64}") {
            let acc = AcceptedAnswers::parse(&raw);
            for t in acc.iter() {
                prop_assert!(!t.is_empty());
                prop_assert_eq!(t, t.trim());
                prop_assert_eq!(t.to_string(), t.to_lowercase());
            }
        }

        #[test]
        fn every_token_checks_as_correct(raw in "[a-zA-Z0-9 ,/]{0,48}") {
            let acc = AcceptedAnswers::parse(&raw);
            let tokens: Vec<String> = acc.iter().map(str::to_string).collect();
            for t in tokens {
                prop_assert_eq!(acc.check(&t.to_uppercase()), Verdict::Correct);
            }
        }
    }
}
