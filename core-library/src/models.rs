//! Domain models for the novel mirror
//!
//! Three record kinds are persisted: the novel summary ([`NovelInfo`]), its
//! ordered chapter index ([`NovelIndex`]) and the chapters themselves
//! ([`NovelChapter`]).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

// =============================================================================
// Identity
// =============================================================================

/// The natural key of a tracked novel.
///
/// Two scraped novels are the same tracked novel iff both fields are equal,
/// regardless of which source key they were found under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NovelIdentity {
    pub name: String,
    pub author: String,
}

impl NovelIdentity {
    pub fn new(name: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            author: author.into(),
        }
    }
}

impl fmt::Display for NovelIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.name, self.author)
    }
}

// =============================================================================
// Domain Models
// =============================================================================

/// Summary record of a mirrored novel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct NovelInfo {
    pub id: String,
    pub name: String,
    pub author: String,
    /// Genre/board label taken from the source
    pub category: String,
    /// Serialization state ("ongoing", "complete", ...)
    pub status: String,
    pub description: String,
    /// Cover image bytes, absent when the download failed or no image exists
    pub cover: Option<Vec<u8>>,
    pub created_at: i64,
    pub updated_at: i64,
    pub latest_chapter_id: Option<String>,
    pub latest_chapter_name: Option<String>,
    /// Id of the [`NovelIndex`] owned by this novel
    pub index_id: String,
}

impl NovelInfo {
    pub fn identity(&self) -> NovelIdentity {
        NovelIdentity::new(self.name.clone(), self.author.clone())
    }

    /// Point the denormalized latest-chapter fields at `latest`.
    pub fn set_latest_chapter(&mut self, latest: Option<&ChapterRef>) {
        self.latest_chapter_id = latest.map(|c| c.chapter_id.clone());
        self.latest_chapter_name = latest.map(|c| c.chapter_name.clone());
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Novel id cannot be empty".to_string());
        }

        if self.name.trim().is_empty() {
            return Err("Novel name cannot be empty".to_string());
        }

        if self.index_id.trim().is_empty() {
            return Err("Novel index id cannot be empty".to_string());
        }

        if self.latest_chapter_id.is_some() != self.latest_chapter_name.is_some() {
            return Err("Latest chapter id and name must be set together".to_string());
        }

        Ok(())
    }
}

/// Lightweight pointer from an index to a stored chapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRef {
    pub chapter_id: String,
    pub chapter_name: String,
}

impl ChapterRef {
    pub fn new(chapter_id: impl Into<String>, chapter_name: impl Into<String>) -> Self {
        Self {
            chapter_id: chapter_id.into(),
            chapter_name: chapter_name.into(),
        }
    }
}

/// Ordered table of contents of a novel.
///
/// The order of `chapters` is the canonical reading order. The sync engine
/// only ever appends to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NovelIndex {
    pub id: String,
    pub novel_id: String,
    pub updated_at: i64,
    pub chapters: Vec<ChapterRef>,
}

impl NovelIndex {
    pub fn new(id: impl Into<String>, novel_id: impl Into<String>, updated_at: i64) -> Self {
        Self {
            id: id.into(),
            novel_id: novel_id.into(),
            updated_at,
            chapters: Vec::new(),
        }
    }

    pub fn chapter_names(&self) -> Vec<&str> {
        self.chapters.iter().map(|c| c.chapter_name.as_str()).collect()
    }

    pub fn latest(&self) -> Option<&ChapterRef> {
        self.chapters.last()
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    /// Append refs at the end, keeping existing entries untouched.
    pub fn append(&mut self, refs: impl IntoIterator<Item = ChapterRef>, updated_at: i64) {
        self.chapters.extend(refs);
        self.updated_at = updated_at;
    }
}

/// A stored chapter. Never modified after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct NovelChapter {
    pub id: String,
    pub novel_id: String,
    pub name: String,
    pub updated_at: i64,
    pub word_count: i64,
    pub content: String,
}

impl NovelChapter {
    /// Build a chapter record, deriving the word count from `content`.
    pub fn new(
        id: impl Into<String>,
        novel_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
        updated_at: i64,
    ) -> Self {
        let content = content.into();
        Self {
            id: id.into(),
            novel_id: novel_id.into(),
            name: name.into(),
            updated_at,
            word_count: word_count(&content),
            content,
        }
    }

    pub fn as_ref_entry(&self) -> ChapterRef {
        ChapterRef::new(self.id.clone(), self.name.clone())
    }
}

/// Count of non-whitespace characters.
///
/// Serial fiction is largely CJK text, where a character is the unit a
/// reader would call a word.
pub fn word_count(text: &str) -> i64 {
    text.chars().filter(|c| !c.is_whitespace()).count() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_info() -> NovelInfo {
        NovelInfo {
            id: "n1".to_string(),
            name: "Sword Song".to_string(),
            author: "Li".to_string(),
            category: "wuxia".to_string(),
            status: "ongoing".to_string(),
            description: String::new(),
            cover: None,
            created_at: 10,
            updated_at: 10,
            latest_chapter_id: None,
            latest_chapter_name: None,
            index_id: "i1".to_string(),
        }
    }

    #[test]
    fn test_word_count_ignores_whitespace() {
        assert_eq!(word_count("第一章  风起"), 5);
        assert_eq!(word_count("a b\nc\t"), 3);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn test_chapter_new_derives_word_count() {
        let chapter = NovelChapter::new("c1", "n1", "Chapter 1", "one two", 5);
        assert_eq!(chapter.word_count, 6);
        assert_eq!(chapter.as_ref_entry(), ChapterRef::new("c1", "Chapter 1"));
    }

    #[test]
    fn test_index_append_keeps_prefix() {
        let mut index = NovelIndex::new("i1", "n1", 1);
        index.append(vec![ChapterRef::new("c1", "A")], 2);
        index.append(vec![ChapterRef::new("c2", "B"), ChapterRef::new("c3", "C")], 3);

        assert_eq!(index.chapter_names(), vec!["A", "B", "C"]);
        assert_eq!(index.latest().map(|c| c.chapter_id.as_str()), Some("c3"));
        assert_eq!(index.updated_at, 3);
    }

    #[test]
    fn test_set_latest_chapter() {
        let mut info = sample_info();
        info.set_latest_chapter(Some(&ChapterRef::new("c9", "Finale")));
        assert_eq!(info.latest_chapter_id.as_deref(), Some("c9"));
        assert_eq!(info.latest_chapter_name.as_deref(), Some("Finale"));

        info.set_latest_chapter(None);
        assert!(info.latest_chapter_id.is_none());
        assert!(info.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_half_latest_pointer() {
        let mut info = sample_info();
        info.latest_chapter_id = Some("c1".to_string());
        assert!(info.validate().is_err());

        let mut info = sample_info();
        info.name = "  ".to_string();
        assert!(info.validate().is_err());
    }

    #[test]
    fn test_identity() {
        let info = sample_info();
        assert_eq!(info.identity(), NovelIdentity::new("Sword Song", "Li"));
        assert_eq!(info.identity().to_string(), "Sword Song / Li");
    }
}
