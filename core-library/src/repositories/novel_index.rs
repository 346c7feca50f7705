//! Chapter index repository trait and implementation
//!
//! The ordered chapter list is stored as a JSON array in a single column so
//! that every index write is one statement.

use crate::error::{LibraryError, Result};
use crate::models::{ChapterRef, NovelIndex};
use async_trait::async_trait;
use sqlx::sqlite::SqliteExecutor;
use sqlx::{query, query_as, FromRow, SqlitePool};

#[async_trait]
pub trait NovelIndexRepository: Send + Sync {
    /// Insert a new index
    async fn insert(&self, index: &NovelIndex) -> Result<()>;

    /// Replace the stored chapter list and timestamp of an existing index
    ///
    /// # Errors
    /// Returns [`LibraryError::NotFound`] if the index does not exist.
    async fn update(&self, index: &NovelIndex) -> Result<()>;

    /// Find an index by its id
    async fn find_by_id(&self, id: &str) -> Result<Option<NovelIndex>>;
}

#[derive(Debug, FromRow)]
struct IndexRow {
    id: String,
    novel_id: String,
    updated_at: i64,
    chapters: String,
}

impl TryFrom<IndexRow> for NovelIndex {
    type Error = LibraryError;

    fn try_from(row: IndexRow) -> Result<Self> {
        let chapters: Vec<ChapterRef> = serde_json::from_str(&row.chapters)?;
        Ok(NovelIndex {
            id: row.id,
            novel_id: row.novel_id,
            updated_at: row.updated_at,
            chapters,
        })
    }
}

/// SQLite implementation of NovelIndexRepository
pub struct SqliteNovelIndexRepository {
    pool: SqlitePool,
}

impl SqliteNovelIndexRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn validate(index: &NovelIndex) -> Result<()> {
    if index.id.trim().is_empty() {
        return Err(LibraryError::InvalidInput {
            field: "NovelIndex.id".to_string(),
            message: "Index id cannot be empty".to_string(),
        });
    }
    Ok(())
}

pub(crate) async fn insert_index<'e, E>(executor: E, index: &NovelIndex) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    validate(index)?;
    let chapters = serde_json::to_string(&index.chapters)?;

    query("INSERT INTO novel_index (id, novel_id, updated_at, chapters) VALUES (?, ?, ?, ?)")
        .bind(&index.id)
        .bind(&index.novel_id)
        .bind(index.updated_at)
        .bind(chapters)
        .execute(executor)
        .await?;

    Ok(())
}

#[async_trait]
impl NovelIndexRepository for SqliteNovelIndexRepository {
    async fn insert(&self, index: &NovelIndex) -> Result<()> {
        insert_index(&self.pool, index).await
    }

    async fn update(&self, index: &NovelIndex) -> Result<()> {
        validate(index)?;
        let chapters = serde_json::to_string(&index.chapters)?;

        let result = query("UPDATE novel_index SET updated_at = ?, chapters = ? WHERE id = ?")
            .bind(index.updated_at)
            .bind(chapters)
            .bind(&index.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::NotFound {
                entity_type: "NovelIndex".to_string(),
                id: index.id.clone(),
            });
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<NovelIndex>> {
        let row = query_as::<_, IndexRow>(
            "SELECT id, novel_id, updated_at, chapters FROM novel_index WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(NovelIndex::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn test_insert_and_find_index() {
        let repo = SqliteNovelIndexRepository::new(create_test_pool().await.unwrap());

        let mut index = NovelIndex::new("i1", "n1", 10);
        index.append(
            vec![ChapterRef::new("c1", "第一章"), ChapterRef::new("c2", "第二章")],
            10,
        );
        repo.insert(&index).await.unwrap();

        let found = repo.find_by_id("i1").await.unwrap().unwrap();
        assert_eq!(found, index);
        assert_eq!(found.chapter_names(), vec!["第一章", "第二章"]);
    }

    #[tokio::test]
    async fn test_update_preserves_order() {
        let repo = SqliteNovelIndexRepository::new(create_test_pool().await.unwrap());

        let mut index = NovelIndex::new("i1", "n1", 10);
        repo.insert(&index).await.unwrap();

        index.append(vec![ChapterRef::new("c1", "A")], 20);
        repo.update(&index).await.unwrap();
        index.append(vec![ChapterRef::new("c2", "B"), ChapterRef::new("c3", "C")], 30);
        repo.update(&index).await.unwrap();

        let found = repo.find_by_id("i1").await.unwrap().unwrap();
        assert_eq!(found.chapter_names(), vec!["A", "B", "C"]);
        assert_eq!(found.updated_at, 30);
    }

    #[tokio::test]
    async fn test_update_missing_index() {
        let repo = SqliteNovelIndexRepository::new(create_test_pool().await.unwrap());
        let result = repo.update(&NovelIndex::new("nope", "n1", 1)).await;
        assert!(matches!(result, Err(LibraryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_find_missing_index() {
        let repo = SqliteNovelIndexRepository::new(create_test_pool().await.unwrap());
        assert!(repo.find_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_chapter_list_is_serialization_error() {
        let pool = create_test_pool().await.unwrap();
        query("INSERT INTO novel_index (id, novel_id, updated_at, chapters) VALUES ('i1', 'n1', 1, 'not json')")
            .execute(&pool)
            .await
            .unwrap();

        let repo = SqliteNovelIndexRepository::new(pool);
        let result = repo.find_by_id("i1").await;
        assert!(matches!(result, Err(LibraryError::Serialization(_))));
    }
}
