//! Similarity-based chapter title matcher
//!
//! Titles are normalized (case folded, punctuation and whitespace dropped)
//! and scored with a blend of Jaro-Winkler and normalized Levenshtein
//! similarity. Two titles carrying different chapter numbers never match,
//! however close the rest of the text is: "Chapter 12" and "Chapter 13"
//! score above any useful threshold.

use bridge_traits::{ChapterMatcher, MatchVerdict};
use strsim::{jaro_winkler, normalized_levenshtein};

/// Default score at or above which two titles are the same chapter
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

const CJK_NUMERALS: &str = "零〇一二两三四五六七八九十百千万";

#[derive(Debug, Clone, Copy)]
pub struct SimilarityMatcher {
    threshold: f64,
}

impl SimilarityMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Default for SimilarityMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl ChapterMatcher for SimilarityMatcher {
    fn similar(&self, a: &str, b: &str) -> MatchVerdict {
        if a == b {
            return MatchVerdict::matched(1.0);
        }

        let a = normalize_title(a);
        let b = normalize_title(b);

        // Nothing left to compare once punctuation is gone
        if a.is_empty() || b.is_empty() {
            return MatchVerdict::mismatched(0.0);
        }

        if a == b {
            return MatchVerdict::matched(1.0);
        }

        let score = title_similarity(&a, &b);

        if numbers_in(&a) != numbers_in(&b) {
            return MatchVerdict::mismatched(score);
        }

        if score >= self.threshold {
            MatchVerdict::matched(score)
        } else {
            MatchVerdict::mismatched(score)
        }
    }
}

/// Lowercase alphanumerics only. CJK characters count as alphanumeric.
fn normalize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn title_similarity(a: &str, b: &str) -> f64 {
    let jw = jaro_winkler(a, b);
    let lev = normalized_levenshtein(a, b);
    jw * 0.6 + lev * 0.4
}

/// Runs of ASCII digits or CJK numerals, in order of appearance
fn numbers_in(title: &str) -> Vec<String> {
    let mut numbers = Vec::new();
    let mut current = String::new();

    for c in title.chars() {
        if c.is_ascii_digit() || CJK_NUMERALS.contains(c) {
            current.push(c);
        } else if !current.is_empty() {
            numbers.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        numbers.push(current);
    }

    // Leading zeros are formatting, not a different number
    numbers
        .into_iter()
        .map(|n| {
            let trimmed = n.trim_start_matches('0');
            if trimmed.is_empty() && !n.is_empty() {
                "0".to_string()
            } else {
                trimmed.to_string()
            }
        })
        .collect()
}
