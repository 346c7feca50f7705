//! Chapter title comparison.

/// Outcome of comparing two chapter titles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchVerdict {
    /// Whether the two titles name the same chapter
    pub is_match: bool,
    /// Similarity in `[0.0, 1.0]`
    pub score: f64,
}

impl MatchVerdict {
    pub fn matched(score: f64) -> Self {
        Self {
            is_match: true,
            score,
        }
    }

    pub fn mismatched(score: f64) -> Self {
        Self {
            is_match: false,
            score,
        }
    }
}

/// Decides whether two chapter titles refer to the same chapter.
///
/// Sources rename chapters slightly over time (a "(final)" suffix, changed
/// punctuation, a corrected typo), so exact string equality is not enough to
/// anchor a stored chapter list against a freshly scraped one.
pub trait ChapterMatcher: Send + Sync {
    fn similar(&self, a: &str, b: &str) -> MatchVerdict;
}

/// Matcher that only accepts byte-identical titles.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatcher;

impl ChapterMatcher for ExactMatcher {
    fn similar(&self, a: &str, b: &str) -> MatchVerdict {
        if a == b {
            MatchVerdict::matched(1.0)
        } else {
            MatchVerdict::mismatched(0.0)
        }
    }
}
