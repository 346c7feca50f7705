//! # Novel Library Module
//!
//! Owns the local mirror database and provides repository patterns for data
//! access.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite database schema and migrations
//! - Domain models for novels, chapter indexes and chapters
//! - One repository per record kind, plus [`NovelStore`](repositories::NovelStore)
//!   bundling them for the synchronization engine

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{LibraryError, Result};
pub use models::{ChapterRef, NovelChapter, NovelIdentity, NovelIndex, NovelInfo};
pub use repositories::{
    NovelChapterRepository, NovelIndexRepository, NovelInfoRepository, NovelStore,
    SqliteNovelChapterRepository, SqliteNovelIndexRepository, SqliteNovelInfoRepository,
    SqliteNovelStore,
};
