//! Query classifier for C4's adaptive α (Open Question (b) in §9).
//!
//! One deterministic rule set, chosen because the source material contains
//! several overlapping, mutually inconsistent heuristics:
//!
//! - **Keyword-heavy** (α lowered toward `keyword_alpha`, default 0.70) if
//!   the query contains a quoted span, a digit, or more than 30% of its
//!   non-initial tokens are capitalized (proper-noun-like).
//! - **Paraphrase-style** (α raised toward `paraphrase_alpha`, default 0.97)
//!   if it is not keyword-heavy and has more than 6 words.
//! - Otherwise, the configured default α is used unchanged.
//!
//! Pure function of the query string: no state, no I/O, no randomness.

/// Classification verdict for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryClass {
    KeywordHeavy,
    ParaphraseStyle,
    Neutral,
}

/// Classify `query` per the rule set documented above.
pub fn classify(query: &str) -> QueryClass {
    let words: Vec<&str> = query.split_whitespace().collect();
    if words.is_empty() {
        return QueryClass::Neutral;
    }

    let has_quote = query.contains('"') || query.contains('\u{201C}') || query.contains('\u{201D}');
    let has_digit = query.chars().any(|c| c.is_ascii_digit());

    let non_initial = &words[1.min(words.len())..];
    let capitalized_ratio = if non_initial.is_empty() {
        0.0
    } else {
        let capitalized = non_initial
            .iter()
            .filter(|w| w.chars().next().is_some_and(|c| c.is_uppercase()))
            .count();
        capitalized as f32 / non_initial.len() as f32
    };

    if has_quote || has_digit || capitalized_ratio > 0.30 {
        return QueryClass::KeywordHeavy;
    }

    if words.len() > 6 {
        return QueryClass::ParaphraseStyle;
    }

    QueryClass::Neutral
}

/// Resolve the α to use for `query` given the configured default and the
/// paraphrase/keyword targets. When `enabled` is false the default is
/// returned unchanged (§6 `enable_query_classifier`).
pub fn resolve_alpha(
    query: &str,
    default_alpha: f32,
    enabled: bool,
    paraphrase_alpha: f32,
    keyword_alpha: f32,
) -> f32 {
    if !enabled {
        return default_alpha;
    }
    match classify(query) {
        QueryClass::KeywordHeavy => keyword_alpha,
        QueryClass::ParaphraseStyle => paraphrase_alpha,
        QueryClass::Neutral => default_alpha,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_span_is_keyword_heavy() {
        assert_eq!(classify("find \"exact phrase\" here"), QueryClass::KeywordHeavy);
    }

    #[test]
    fn digits_are_keyword_heavy() {
        assert_eq!(classify("release notes for version 2026"), QueryClass::KeywordHeavy);
    }

    #[test]
    fn long_lowercase_question_is_paraphrase_style() {
        assert_eq!(
            classify("how safe is nuclear power compared to other energy sources"),
            QueryClass::ParaphraseStyle
        );
    }

    #[test]
    fn short_query_is_neutral() {
        assert_eq!(classify("what is it"), QueryClass::Neutral);
    }

    #[test]
    fn proper_noun_midsentence_is_keyword_heavy() {
        assert_eq!(classify("capital of Italy"), QueryClass::KeywordHeavy);
    }

    #[test]
    fn disabled_classifier_keeps_default() {
        let alpha = resolve_alpha("\"quoted\" 123", 0.9, false, 0.97, 0.70);
        assert_eq!(alpha, 0.9);
    }
}
