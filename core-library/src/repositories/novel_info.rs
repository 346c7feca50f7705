//! Novel summary repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{NovelIdentity, NovelInfo};
use async_trait::async_trait;
use sqlx::sqlite::SqliteExecutor;
use sqlx::{query, query_as, SqlitePool};

/// Novel summary repository interface
#[async_trait]
pub trait NovelInfoRepository: Send + Sync {
    /// Insert a new novel summary
    ///
    /// # Errors
    /// Returns error if:
    /// - A novel with the same id or the same (name, author) already exists
    /// - Validation fails
    /// - Database error occurs
    async fn insert(&self, info: &NovelInfo) -> Result<()>;

    /// Update an existing novel summary
    ///
    /// `created_at`, `name` and `author` are never rewritten.
    ///
    /// # Errors
    /// Returns [`LibraryError::NotFound`] if the novel does not exist.
    async fn update(&self, info: &NovelInfo) -> Result<()>;

    /// Find a novel by its id
    async fn find_by_id(&self, id: &str) -> Result<Option<NovelInfo>>;

    /// Find the tracked novel with exactly this (name, author) pair
    async fn find_by_identity(&self, identity: &NovelIdentity) -> Result<Option<NovelInfo>>;

    /// Whether a novel with this (name, author) pair is tracked
    async fn exists(&self, identity: &NovelIdentity) -> Result<bool>;
}

/// SQLite implementation of NovelInfoRepository
pub struct SqliteNovelInfoRepository {
    pool: SqlitePool,
}

impl SqliteNovelInfoRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

pub(crate) async fn insert_info<'e, E>(executor: E, info: &NovelInfo) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    info.validate().map_err(|e| LibraryError::InvalidInput {
        field: "NovelInfo".to_string(),
        message: e,
    })?;

    query(
        r#"
        INSERT INTO novel_info (
            id, name, author, category, status, description, cover,
            created_at, updated_at, latest_chapter_id, latest_chapter_name, index_id
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&info.id)
    .bind(&info.name)
    .bind(&info.author)
    .bind(&info.category)
    .bind(&info.status)
    .bind(&info.description)
    .bind(&info.cover)
    .bind(info.created_at)
    .bind(info.updated_at)
    .bind(&info.latest_chapter_id)
    .bind(&info.latest_chapter_name)
    .bind(&info.index_id)
    .execute(executor)
    .await?;

    Ok(())
}

#[async_trait]
impl NovelInfoRepository for SqliteNovelInfoRepository {
    async fn insert(&self, info: &NovelInfo) -> Result<()> {
        insert_info(&self.pool, info).await
    }

    async fn update(&self, info: &NovelInfo) -> Result<()> {
        info.validate().map_err(|e| LibraryError::InvalidInput {
            field: "NovelInfo".to_string(),
            message: e,
        })?;

        let result = query(
            r#"
            UPDATE novel_info
            SET category = ?, status = ?, description = ?, cover = ?, updated_at = ?,
                latest_chapter_id = ?, latest_chapter_name = ?, index_id = ?
            WHERE id = ?
            "#,
        )
        .bind(&info.category)
        .bind(&info.status)
        .bind(&info.description)
        .bind(&info.cover)
        .bind(info.updated_at)
        .bind(&info.latest_chapter_id)
        .bind(&info.latest_chapter_name)
        .bind(&info.index_id)
        .bind(&info.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::NotFound {
                entity_type: "NovelInfo".to_string(),
                id: info.id.clone(),
            });
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<NovelInfo>> {
        let info = query_as::<_, NovelInfo>("SELECT * FROM novel_info WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(info)
    }

    async fn find_by_identity(&self, identity: &NovelIdentity) -> Result<Option<NovelInfo>> {
        let info =
            query_as::<_, NovelInfo>("SELECT * FROM novel_info WHERE name = ? AND author = ?")
                .bind(&identity.name)
                .bind(&identity.author)
                .fetch_optional(&self.pool)
                .await?;

        Ok(info)
    }

    async fn exists(&self, identity: &NovelIdentity) -> Result<bool> {
        let count: i64 =
            query_as("SELECT COUNT(*) as count FROM novel_info WHERE name = ? AND author = ?")
                .bind(&identity.name)
                .bind(&identity.author)
                .fetch_one(&self.pool)
                .await
                .map(|row: (i64,)| row.0)?;

        Ok(count > 0)
    }
}
