//! # Run Reports
//!
//! Typed results of a synchronization run.
//!
//! Every source key handed to a run ends in exactly one [`ItemOutcome`]. The
//! outcomes are collected, in update-list order, into a [`RunReport`] whose
//! [`RunStats`] summarize them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RunId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Why an item was skipped without touching the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// Details or chapter list could not be fetched
    FetchFailed(String),
    /// The tracked novel points at an index that does not exist
    IndexMissing { index_id: String },
    /// The run was stopped before the item wrote anything
    Cancelled,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::FetchFailed(message) => write!(f, "fetch failed: {}", message),
            SkipReason::IndexMissing { index_id } => write!(f, "index {} missing", index_id),
            SkipReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of synchronizing one source key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// First sighting; the novel, its index and its chapters were stored
    Added {
        novel_id: String,
        chapters_added: u64,
        chapters_skipped: u64,
    },
    /// New chapters were appended to a tracked novel
    Updated {
        novel_id: String,
        chapters_added: u64,
        chapters_skipped: u64,
    },
    /// Nothing new, or every new chapter failed; nothing was written
    Unchanged {
        novel_id: String,
        chapters_skipped: u64,
    },
    /// Stored and observed chapter lists share no anchor; nothing was written
    Diverged { novel_id: String },
    Skipped { reason: SkipReason },
    Failed { error: String },
}

impl ItemOutcome {
    /// Short label used in events and logs
    pub fn kind(&self) -> &'static str {
        match self {
            ItemOutcome::Added { .. } => "added",
            ItemOutcome::Updated { .. } => "updated",
            ItemOutcome::Unchanged { .. } => "unchanged",
            ItemOutcome::Diverged { .. } => "diverged",
            ItemOutcome::Skipped { .. } => "skipped",
            ItemOutcome::Failed { .. } => "failed",
        }
    }

    pub fn novel_id(&self) -> Option<&str> {
        match self {
            ItemOutcome::Added { novel_id, .. }
            | ItemOutcome::Updated { novel_id, .. }
            | ItemOutcome::Unchanged { novel_id, .. }
            | ItemOutcome::Diverged { novel_id } => Some(novel_id),
            ItemOutcome::Skipped { .. } | ItemOutcome::Failed { .. } => None,
        }
    }

    pub fn chapters_added(&self) -> u64 {
        match self {
            ItemOutcome::Added { chapters_added, .. }
            | ItemOutcome::Updated { chapters_added, .. } => *chapters_added,
            _ => 0,
        }
    }

    pub fn chapters_skipped(&self) -> u64 {
        match self {
            ItemOutcome::Added {
                chapters_skipped, ..
            }
            | ItemOutcome::Updated {
                chapters_skipped, ..
            }
            | ItemOutcome::Unchanged {
                chapters_skipped, ..
            } => *chapters_skipped,
            _ => 0,
        }
    }
}

/// One entry of a run report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReport {
    pub source_key: String,
    pub outcome: ItemOutcome,
    pub duration_ms: u64,
}

// ============================================================================
// Run Report
// ============================================================================

/// Outcome counts of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub added: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub diverged: u64,
    pub skipped: u64,
    pub failed: u64,
    pub chapters_added: u64,
    pub chapters_skipped: u64,
}

impl RunStats {
    pub fn record(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Added { .. } => self.added += 1,
            ItemOutcome::Updated { .. } => self.updated += 1,
            ItemOutcome::Unchanged { .. } => self.unchanged += 1,
            ItemOutcome::Diverged { .. } => self.diverged += 1,
            ItemOutcome::Skipped { .. } => self.skipped += 1,
            ItemOutcome::Failed { .. } => self.failed += 1,
        }
        self.chapters_added += outcome.chapters_added();
        self.chapters_skipped += outcome.chapters_skipped();
    }

    pub fn total_items(&self) -> u64 {
        self.added + self.updated + self.unchanged + self.diverged + self.skipped + self.failed
    }
}

/// Everything a run did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    /// Update-list key the run was started with
    pub source_key: String,
    pub site: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Whether `stop()` was called before the run finished
    pub cancelled: bool,
    pub stats: RunStats,
    /// Per-item results in update-list order
    pub items: Vec<ItemReport>,
}

impl RunReport {
    pub fn new(run_id: RunId, source_key: impl Into<String>, site: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            source_key: source_key.into(),
            site: site.into(),
            started_at,
            finished_at: started_at,
            duration_ms: 0,
            cancelled: false,
            stats: RunStats::default(),
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, item: ItemReport) {
        self.stats.record(&item.outcome);
        self.items.push(item);
    }

    pub fn outcome_for(&self, source_key: &str) -> Option<&ItemOutcome> {
        self.items
            .iter()
            .find(|item| item.source_key == source_key)
            .map(|item| &item.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(source_key: &str, outcome: ItemOutcome) -> ItemReport {
        ItemReport {
            source_key: source_key.to_string(),
            outcome,
            duration_ms: 1,
        }
    }

    #[test]
    fn test_run_stats_counts_every_outcome() {
        let mut report = RunReport::new(RunId::new(), "updates", "https://novels.example", Utc::now());

        report.push(item(
            "a",
            ItemOutcome::Added {
                novel_id: "n1".to_string(),
                chapters_added: 5,
                chapters_skipped: 1,
            },
        ));
        report.push(item(
            "b",
            ItemOutcome::Updated {
                novel_id: "n2".to_string(),
                chapters_added: 2,
                chapters_skipped: 0,
            },
        ));
        report.push(item(
            "c",
            ItemOutcome::Unchanged {
                novel_id: "n3".to_string(),
                chapters_skipped: 3,
            },
        ));
        report.push(item("d", ItemOutcome::Diverged { novel_id: "n4".to_string() }));
        report.push(item("e", ItemOutcome::Skipped { reason: SkipReason::Cancelled }));
        report.push(item("f", ItemOutcome::Failed { error: "disk full".to_string() }));

        let stats = report.stats;
        assert_eq!(
            (stats.added, stats.updated, stats.unchanged, stats.diverged, stats.skipped, stats.failed),
            (1, 1, 1, 1, 1, 1)
        );
        assert_eq!(stats.chapters_added, 7);
        assert_eq!(stats.chapters_skipped, 4);
        assert_eq!(stats.total_items(), 6);
        assert_eq!(report.outcome_for("f").map(ItemOutcome::kind), Some("failed"));
        assert!(report.outcome_for("zzz").is_none());
    }

    #[test]
    fn test_outcome_accessors() {
        let outcome = ItemOutcome::Updated {
            novel_id: "n1".to_string(),
            chapters_added: 4,
            chapters_skipped: 1,
        };
        assert_eq!(outcome.kind(), "updated");
        assert_eq!(outcome.novel_id(), Some("n1"));
        assert_eq!(outcome.chapters_added(), 4);

        let skipped = ItemOutcome::Skipped {
            reason: SkipReason::FetchFailed("HTTP 404".to_string()),
        };
        assert_eq!(skipped.novel_id(), None);
        assert_eq!(skipped.chapters_added(), 0);
    }

    #[test]
    fn test_outcome_serialization() {
        let skipped = ItemOutcome::Skipped {
            reason: SkipReason::IndexMissing {
                index_id: "i9".to_string(),
            },
        };
        let json = serde_json::to_value(&skipped).unwrap();
        assert_eq!(json["outcome"], "skipped");
        assert_eq!(json["reason"]["kind"], "index_missing");
        assert_eq!(json["reason"]["detail"]["index_id"], "i9");
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::Cancelled.to_string(), "cancelled");
        assert_eq!(
            SkipReason::FetchFailed("timeout".to_string()).to_string(),
            "fetch failed: timeout"
        );
    }

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }
}
