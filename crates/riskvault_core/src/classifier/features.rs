//! Document feature extraction.
//!
//! Features are lowercase word tokens of at least two characters, counted
//! per document.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}][\p{L}\p{N}_'-]*").expect("valid word regex"));

const MIN_TOKEN_CHARS: usize = 2;

/// Term counts for one document.
pub type TermCounts = BTreeMap<String, u64>;

/// Splits `text` into normalized tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    WORD_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS)
        .collect()
}

/// Counts normalized tokens in `text`.
pub fn term_counts(text: &str) -> TermCounts {
    let mut counts = TermCounts::new();
    for token in tokenize(text) {
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}
