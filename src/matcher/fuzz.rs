//! FuzzyWuzzy-compatible string similarity.
//!
//! All scores are integers in `0..=100`. The underlying similarity is
//! rapidfuzz's normalized indel similarity, `2 * LCS / (|a| + |b|)`, which
//! is what FuzzyWuzzy's `ratio` computes; the partial and token-set
//! variants are composed on top of it here.
//!
//! - [`ratio`]: whole-string similarity
//! - [`partial_ratio`]: best window of the longer string against the shorter one
//! - [`token_set_ratio`]: order and duplicate insensitive comparison of words

use rapidfuzz::distance::indel;
use std::collections::BTreeSet;

/// Replace every non-alphanumeric character with a space, lower-case and
/// collapse whitespace.
pub fn full_process(s: &str) -> String {
    let replaced: String = s
        .chars()
        .flat_map(|c| {
            let mapped: Vec<char> = if c.is_alphanumeric() {
                c.to_lowercase().collect()
            } else {
                vec![' ']
            };
            mapped
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized indel similarity in `0.0..=1.0`
fn similarity(a: &[char], b: &[char]) -> f64 {
    indel::normalized_similarity(a.iter().copied(), b.iter().copied())
}

fn score(similarity: f64) -> u32 {
    (similarity * 100.0).round() as u32
}

/// Whole-string similarity; `0` when either side is empty.
pub fn ratio(a: &str, b: &str) -> u32 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    score(indel::normalized_similarity(a.chars(), b.chars()))
}

/// Best [`ratio`] of the shorter string against every equal-length window
/// of the longer one.
pub fn partial_ratio(a: &str, b: &str) -> u32 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let mut best = 0.0f64;
    for window in longer.windows(shorter.len()) {
        best = best.max(similarity(&shorter, window));
        if best >= 1.0 {
            break;
        }
    }
    score(best)
}

fn tokens(s: &str) -> BTreeSet<String> {
    full_process(s)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn join(tokens: &[&String]) -> String {
    tokens
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn combine(intersection: &str, rest: &str) -> String {
    format!("{intersection} {rest}").trim().to_string()
}

/// Compare the shared words of both strings against each string's full
/// sorted word set and return the best of the pairwise ratios.
pub fn token_set_ratio(a: &str, b: &str) -> u32 {
    let left = tokens(a);
    let right = tokens(b);
    if left.is_empty() || right.is_empty() {
        return 0;
    }

    // BTreeSet iteration is sorted, so every joined string is sorted too
    let intersection = join(&left.intersection(&right).collect::<Vec<_>>());
    let left_only = join(&left.difference(&right).collect::<Vec<_>>());
    let right_only = join(&right.difference(&left).collect::<Vec<_>>());

    let left_combined = combine(&intersection, &left_only);
    let right_combined = combine(&intersection, &right_only);

    ratio(&intersection, &left_combined)
        .max(ratio(&intersection, &right_combined))
        .max(ratio(&left_combined, &right_combined))
}
