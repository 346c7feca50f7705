//! # Incremental Sync Module
//!
//! Mirrors novels and their chapters from a source site into the local
//! library, fetching only what the library does not have yet.
//!
//! ## Overview
//!
//! A run walks the source's "recently updated" list. For every novel it:
//! - Recognizes it by (name, author), regardless of the source key it was listed under
//! - Stores it with every chapter when it is new
//! - Otherwise diffs the source's chapter list against the stored index and
//!   fetches only the chapters past the last stored one
//!
//! ## Components
//!
//! - **Chapter Diff** (`diff`): Finds where a chapter list continues past the stored index
//! - **Matcher** (`matcher`): Fuzzy chapter title equivalence
//! - **Item Synchronizer** (`synchronizer`): Add and update paths for one novel
//! - **Sync Engine** (`coordinator`): Concurrent runs over an update list, with stop support
//! - **Run Reports** (`job`): Per-item outcomes and run statistics

pub mod coordinator;
pub mod diff;
pub mod error;
pub mod job;
pub mod matcher;
pub mod synchronizer;

pub use coordinator::SyncEngine;
pub use core_runtime::config::SyncSettings;
pub use diff::{compute_update_start, Anchor, UpdatePlan};
pub use error::{Result, SyncError};
pub use job::{ItemOutcome, ItemReport, RunId, RunReport, RunStats, SkipReason};
pub use matcher::{SimilarityMatcher, DEFAULT_SIMILARITY_THRESHOLD};
pub use synchronizer::{ItemSynchronizer, SyncContext};
