// src/dedup/similarity.rs
//! Name normalization and fuzzy word-set similarity for duplicate detection.

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashSet;
use strsim::jaro_winkler;

/// Minimum Jaccard similarity for two names to count as duplicates.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;

/// Words at or above this Jaro-Winkler score are treated as the same set
/// element ("program" / "programme", "organisation" / "organization").
pub const WORD_EQUIVALENCE_THRESHOLD: f64 = 0.9;

/// Words must be longer than this many characters to carry signal.
pub const MIN_SIGNIFICANT_WORD_LEN: usize = 3;

/// Length of the word-prefix blocking key.
pub const BLOCK_KEY_LEN: usize = 4;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

/// Lower-cases, strips non-word characters, and collapses whitespace.
pub fn normalize_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The significant words of a normalized name, sorted and deduplicated.
pub fn significant_words(normalized: &str) -> Vec<String> {
    let mut words: Vec<String> = normalized
        .split_whitespace()
        .filter(|w| w.chars().count() > MIN_SIGNIFICANT_WORD_LEN)
        .map(|w| w.to_string())
        .collect();
    words.sort();
    words.dedup();
    words
}

/// Blocking keys for candidate generation: the first [`BLOCK_KEY_LEN`]
/// characters of every significant word. Names whose Jaccard similarity
/// clears the threshold share most of their words, so they always share at
/// least one key; the prefix (rather than the whole word) keeps spelling
/// variants like "program"/"programme" in the same bucket.
pub fn block_keys(normalized: &str) -> HashSet<String> {
    significant_words(normalized)
        .iter()
        .map(|w| w.chars().take(BLOCK_KEY_LEN).collect())
        .collect()
}

/// Full-name similarity: 1.0 for identical normalized names, otherwise the
/// word-set Jaccard of their significant words.
pub fn name_similarity(name_a: &str, name_b: &str) -> f64 {
    let norm_a = normalize_name(name_a);
    let norm_b = normalize_name(name_b);
    if norm_a.is_empty() || norm_b.is_empty() {
        return 0.0;
    }
    if norm_a == norm_b {
        return 1.0;
    }
    jaccard_over_words(&significant_words(&norm_a), &significant_words(&norm_b))
}

/// Word-set Jaccard where near-identical words count as the same element.
///
/// Matching is greedy over the best-scoring word pairs, with ties broken on
/// the unordered word pair itself, so the result is symmetric in its
/// arguments. Each word participates in at most one match; the union term is
/// `|a| + |b| - matched`.
pub fn jaccard_over_words(words_a: &[String], words_b: &[String]) -> f64 {
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let mut scored_pairs: Vec<(f64, usize, usize)> = Vec::new();
    for (i, word_a) in words_a.iter().enumerate() {
        for (j, word_b) in words_b.iter().enumerate() {
            let score = jaro_winkler(word_a, word_b);
            if score >= WORD_EQUIVALENCE_THRESHOLD {
                scored_pairs.push((score, i, j));
            }
        }
    }

    scored_pairs.sort_by(|x, y| {
        y.0.partial_cmp(&x.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                let x_key = unordered_key(&words_a[x.1], &words_b[x.2]);
                let y_key = unordered_key(&words_a[y.1], &words_b[y.2]);
                x_key.cmp(&y_key)
            })
    });

    let mut used_a = vec![false; words_a.len()];
    let mut used_b = vec![false; words_b.len()];
    let mut matched = 0usize;
    for (_, i, j) in scored_pairs {
        if !used_a[i] && !used_b[j] {
            used_a[i] = true;
            used_b[j] = true;
            matched += 1;
        }
    }

    let union = words_a.len() + words_b.len() - matched;
    matched as f64 / union as f64
}

fn unordered_key<'a>(word_a: &'a str, word_b: &'a str) -> (&'a str, &'a str) {
    if word_a <= word_b {
        (word_a, word_b)
    } else {
        (word_b, word_a)
    }
}
