//! Chapter repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::NovelChapter;
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

/// Chapter repository interface
///
/// Chapters are write-once: there is no update or delete.
#[async_trait]
pub trait NovelChapterRepository: Send + Sync {
    /// Store a chapter under `novel_id`
    ///
    /// # Errors
    /// Returns error if:
    /// - `chapter.novel_id` does not equal `novel_id`
    /// - A chapter with the same id already exists
    /// - Database error occurs
    async fn insert(&self, novel_id: &str, chapter: &NovelChapter) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<NovelChapter>>;

    /// All chapters stored for a novel, in insertion order of their ids
    async fn list_by_novel(&self, novel_id: &str) -> Result<Vec<NovelChapter>>;

    async fn count_by_novel(&self, novel_id: &str) -> Result<i64>;
}

/// SQLite implementation of NovelChapterRepository
pub struct SqliteNovelChapterRepository {
    pool: SqlitePool,
}

impl SqliteNovelChapterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NovelChapterRepository for SqliteNovelChapterRepository {
    async fn insert(&self, novel_id: &str, chapter: &NovelChapter) -> Result<()> {
        if chapter.novel_id != novel_id {
            return Err(LibraryError::InvalidInput {
                field: "NovelChapter.novel_id".to_string(),
                message: format!(
                    "chapter {} belongs to {}, not {}",
                    chapter.id, chapter.novel_id, novel_id
                ),
            });
        }

        if chapter.id.trim().is_empty() {
            return Err(LibraryError::InvalidInput {
                field: "NovelChapter.id".to_string(),
                message: "Chapter id cannot be empty".to_string(),
            });
        }

        query(
            r#"
            INSERT INTO novel_chapters (id, novel_id, name, updated_at, word_count, content)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&chapter.id)
        .bind(novel_id)
        .bind(&chapter.name)
        .bind(chapter.updated_at)
        .bind(chapter.word_count)
        .bind(&chapter.content)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<NovelChapter>> {
        let chapter = query_as::<_, NovelChapter>("SELECT * FROM novel_chapters WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(chapter)
    }

    async fn list_by_novel(&self, novel_id: &str) -> Result<Vec<NovelChapter>> {
        // Generated ids are time-ordered, so id order is write order
        let chapters = query_as::<_, NovelChapter>(
            "SELECT * FROM novel_chapters WHERE novel_id = ? ORDER BY id ASC",
        )
        .bind(novel_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(chapters)
    }

    async fn count_by_novel(&self, novel_id: &str) -> Result<i64> {
        let count: i64 = query_as("SELECT COUNT(*) as count FROM novel_chapters WHERE novel_id = ?")
            .bind(novel_id)
            .fetch_one(&self.pool)
            .await
            .map(|row: (i64,)| row.0)?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn test_insert_and_find_chapter() {
        let repo = SqliteNovelChapterRepository::new(create_test_pool().await.unwrap());

        let chapter = NovelChapter::new("c1", "n1", "第一章 风起", "山雨欲来 风满楼", 50);
        repo.insert("n1", &chapter).await.unwrap();

        let found = repo.find_by_id("c1").await.unwrap().unwrap();
        assert_eq!(found, chapter);
        assert_eq!(found.word_count, 7);
    }

    #[tokio::test]
    async fn test_list_and_count_by_novel() {
        let repo = SqliteNovelChapterRepository::new(create_test_pool().await.unwrap());

        for (id, name) in [("c1", "A"), ("c2", "B"), ("c3", "C")] {
            repo.insert("n1", &NovelChapter::new(id, "n1", name, "text", 1))
                .await
                .unwrap();
        }
        repo.insert("n2", &NovelChapter::new("c4", "n2", "Other", "text", 1))
            .await
            .unwrap();

        let chapters = repo.list_by_novel("n1").await.unwrap();
        let names: Vec<_> = chapters.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);

        assert_eq!(repo.count_by_novel("n1").await.unwrap(), 3);
        assert_eq!(repo.count_by_novel("n2").await.unwrap(), 1);
        assert_eq!(repo.count_by_novel("n3").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mismatched_owner_rejected() {
        let repo = SqliteNovelChapterRepository::new(create_test_pool().await.unwrap());
        let chapter = NovelChapter::new("c1", "n1", "A", "text", 1);

        let result = repo.insert("n2", &chapter).await;
        assert!(matches!(result, Err(LibraryError::InvalidInput { .. })));
        assert_eq!(repo.count_by_novel("n2").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_chapter_id_rejected() {
        let repo = SqliteNovelChapterRepository::new(create_test_pool().await.unwrap());
        let chapter = NovelChapter::new("c1", "n1", "A", "text", 1);

        repo.insert("n1", &chapter).await.unwrap();
        let result = repo.insert("n1", &chapter).await;
        assert!(matches!(result, Err(LibraryError::Database(_))));
    }
}
