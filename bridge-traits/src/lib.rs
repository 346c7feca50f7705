//! # Collaborator Bridge Traits
//!
//! Contracts between the synchronization core and the collaborators it
//! consumes but does not own.
//!
//! ## Overview
//!
//! The core never talks to a website, a clock or an id allocator directly.
//! Each of those capabilities is expressed here as a trait so that hosts can
//! plug in a site-specific implementation and tests can plug in fakes.
//!
//! ## Traits
//!
//! ### Source access
//! - [`Fetcher`](fetcher::Fetcher) - Update lists, novel details, chapter lists,
//!   chapter text and cover images for one source site
//!
//! ### Decision helpers
//! - [`ChapterMatcher`](matcher::ChapterMatcher) - Fuzzy "same chapter" verdicts
//! - [`IdGenerator`](ids::IdGenerator) - Unique, sortable record identifiers
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to a host pipeline
//!
//! ## Error Handling
//!
//! Source access fails with [`FetchError`](error::FetchError), which is kept
//! distinct from [`BridgeError`](error::BridgeError) so the engine can tell
//! "the site did not answer" apart from every other failure class.
//!
//! ## Thread Safety
//!
//! Every trait requires `Send + Sync`: one engine run shares a single
//! implementation across all of its concurrent item workers.

pub mod error;
pub mod fetcher;
pub mod ids;
pub mod matcher;
pub mod time;

pub use error::{BridgeError, FetchError};

// Re-export commonly used types
pub use fetcher::{ChapterEntry, Fetcher, NovelDetails};
pub use ids::{IdGenerator, UuidV7Generator};
pub use matcher::{ChapterMatcher, ExactMatcher, MatchVerdict};
pub use time::{Clock, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
