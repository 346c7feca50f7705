//! # Chapter Diff Engine
//!
//! Decides where a freshly scraped chapter list continues past what is
//! already stored.
//!
//! ## Algorithm
//!
//! The stored list (`old`) is never reordered, only appended to. To find
//! the first chapter of `new` that is not yet stored:
//!
//! 1. An empty `old` means nothing is stored: fetch everything from 0.
//! 2. Scan `new` from its end towards its start, looking for the last
//!    stored title. A candidate matches when it is equal or the
//!    [`ChapterMatcher`] says it names the same chapter. A hit at `i`
//!    means everything after `i` is new.
//! 3. Sources occasionally retitle or withdraw their newest chapter, so if
//!    the last stored title is nowhere in `new`, repeat the scan with the
//!    second-to-last stored title.
//! 4. Otherwise the lists have diverged and no update is attempted.

use bridge_traits::ChapterMatcher;

/// Which stored chapter anchored the new list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Last,
    SecondToLast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePlan {
    /// Nothing stored yet; every chapter of `new` is missing
    Cold,
    /// The anchor is the final entry of `new`; nothing to fetch
    UpToDate { anchor: Anchor, start: usize },
    /// `new[start..]` is missing from the store
    Append { start: usize, anchor: Anchor },
    /// No anchor found
    Diverged,
}

impl UpdatePlan {
    pub fn needs_update(&self) -> bool {
        matches!(self, UpdatePlan::Cold | UpdatePlan::Append { .. })
    }

    /// Index into `new` of the first chapter to fetch
    pub fn start_index(&self) -> usize {
        match self {
            UpdatePlan::Cold | UpdatePlan::Diverged => 0,
            UpdatePlan::UpToDate { start, .. } | UpdatePlan::Append { start, .. } => *start,
        }
    }

    pub fn is_diverged(&self) -> bool {
        matches!(self, UpdatePlan::Diverged)
    }
}

/// Compute where `new` continues past `old`.
pub fn compute_update_start<O, N>(old: &[O], new: &[N], matcher: &dyn ChapterMatcher) -> UpdatePlan
where
    O: AsRef<str>,
    N: AsRef<str>,
{
    let Some(last) = old.last() else {
        return UpdatePlan::Cold;
    };

    let mut anchors = vec![(last.as_ref(), Anchor::Last)];
    if old.len() >= 2 {
        anchors.push((old[old.len() - 2].as_ref(), Anchor::SecondToLast));
    }

    for (target, anchor) in anchors {
        if let Some(i) = find_from_end(target, new, matcher) {
            let start = i + 1;
            return if start == new.len() {
                UpdatePlan::UpToDate { anchor, start }
            } else {
                UpdatePlan::Append { start, anchor }
            };
        }
    }

    UpdatePlan::Diverged
}

fn find_from_end<N: AsRef<str>>(target: &str, new: &[N], matcher: &dyn ChapterMatcher) -> Option<usize> {
    new.iter()
        .enumerate()
        .rev()
        .find(|(_, candidate)| {
            let candidate = candidate.as_ref();
            candidate == target || matcher.similar(target, candidate).is_match
        })
        .map(|(i, _)| i)
}
