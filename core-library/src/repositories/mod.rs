//! # Repository Pattern Implementation
//!
//! Repository traits and their SQLite implementations, one per record kind.
//!
//! ## Architecture
//!
//! - Traits define the interface for each repository
//! - SQLite implementations use sqlx for async database access
//! - Every write is a single statement; [`NovelStore::insert_novel_with_index`]
//!   is the only multi-record transaction
//!
//! ## Available Repositories
//!
//! - `NovelInfoRepository` - Novel summaries, looked up by id or (name, author)
//! - `NovelIndexRepository` - Ordered chapter tables of contents
//! - `NovelChapterRepository` - Immutable chapter bodies
//! - `NovelStore` - Bundles the three for the synchronization engine

pub mod novel_chapter;
pub mod novel_index;
pub mod novel_info;
pub mod store;

pub use novel_chapter::{NovelChapterRepository, SqliteNovelChapterRepository};
pub use novel_index::{NovelIndexRepository, SqliteNovelIndexRepository};
pub use novel_info::{NovelInfoRepository, SqliteNovelInfoRepository};
pub use store::{NovelStore, SqliteNovelStore};
