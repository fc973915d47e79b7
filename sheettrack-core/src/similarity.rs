//! Fuzzy name similarity
//!
//! Scorers compare two already-normalized names and return a score in
//! `0..=100`. The validator only depends on the [`SimilarityScorer`] trait;
//! concrete scorers are picked by name from configuration.

use crate::error::{Error, Result};
use std::collections::BTreeSet;

/// Scorer used when configuration does not name one
pub const DEFAULT_SCORER: &str = "token_set";

/// Fuzzy comparison between two names.
pub trait SimilarityScorer: Send + Sync {
    /// Identifier used in configuration (e.g., "token_set")
    fn name(&self) -> &str;

    /// Similarity in `0..=100`.
    ///
    /// Returns [`Error::MatchingUnavailable`] when the scorer cannot run.
    fn score(&self, a: &str, b: &str) -> Result<u8>;
}

/// Order- and subset-insensitive comparison over unique word sets.
///
/// `"maria lopez"` vs `"maria fernanda lopez"` scores 100 because one word set
/// contains the other.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSetScorer;

impl SimilarityScorer for TokenSetScorer {
    fn name(&self) -> &str {
        "token_set"
    }

    fn score(&self, a: &str, b: &str) -> Result<u8> {
        Ok(token_set_ratio(a, b))
    }
}

/// Compares the words of both names after sorting them.
///
/// Tolerates reordering but, unlike [`TokenSetScorer`], penalizes extra words.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSortScorer;

impl SimilarityScorer for TokenSortScorer {
    fn name(&self) -> &str {
        "token_sort"
    }

    fn score(&self, a: &str, b: &str) -> Result<u8> {
        let a = sorted_tokens(a).join(" ");
        let b = sorted_tokens(b).join(" ");
        if a.is_empty() || b.is_empty() {
            return Ok(0);
        }
        Ok(ratio(&a, &b))
    }
}

/// Names accepted by [`scorer_by_name`]
pub fn available_scorers() -> Vec<&'static str> {
    vec!["token_set", "token_sort"]
}

/// Create a scorer from its configuration name
pub fn scorer_by_name(name: &str) -> Result<Box<dyn SimilarityScorer>> {
    match name {
        "token_set" => Ok(Box::new(TokenSetScorer)),
        "token_sort" => Ok(Box::new(TokenSortScorer)),
        other => Err(Error::MatchingUnavailable(format!(
            "unknown similarity scorer '{}' (available: {})",
            other,
            available_scorers().join(", ")
        ))),
    }
}

/// Edit-distance ratio scaled to `0..=100`
fn ratio(a: &str, b: &str) -> u8 {
    (strsim::normalized_levenshtein(a, b) * 100.0).round() as u8
}

fn tokens(s: &str) -> BTreeSet<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

fn sorted_tokens(s: &str) -> Vec<String> {
    let mut words: Vec<String> = s
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect();
    words.sort();
    words
}

fn join_trimmed(left: &str, right: &str) -> String {
    format!("{} {}", left, right).trim().to_string()
}

/// Token-set ratio over unique word sets.
pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    let set_a = tokens(a);
    let set_b = tokens(b);
    if set_a.is_empty() || set_b.is_empty() {
        return 0;
    }

    // BTreeSet iteration is already sorted
    let join = |words: Vec<&String>| {
        words
            .into_iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    };
    let sect = join(set_a.intersection(&set_b).collect());
    let a_rest = join(set_a.difference(&set_b).collect());
    let b_rest = join(set_b.difference(&set_a).collect());

    if !sect.is_empty() && (a_rest.is_empty() || b_rest.is_empty()) {
        return 100;
    }

    let combined_a = join_trimmed(&sect, &a_rest);
    let combined_b = join_trimmed(&sect, &b_rest);

    let mut best = ratio(&combined_a, &combined_b);
    if !sect.is_empty() {
        best = best
            .max(ratio(&sect, &combined_a))
            .max(ratio(&sect, &combined_b));
    }
    best
}
