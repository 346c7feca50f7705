//! Aggregate store handed to the synchronization engine

use crate::error::Result;
use crate::models::{NovelIndex, NovelInfo};
use crate::repositories::novel_index::insert_index;
use crate::repositories::novel_info::insert_info;
use crate::repositories::{
    NovelChapterRepository, NovelIndexRepository, NovelInfoRepository,
    SqliteNovelChapterRepository, SqliteNovelIndexRepository, SqliteNovelInfoRepository,
};
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

/// The three repositories the engine writes to, behind one handle.
#[async_trait]
pub trait NovelStore: Send + Sync {
    fn novels(&self) -> &dyn NovelInfoRepository;

    fn indexes(&self) -> &dyn NovelIndexRepository;

    fn chapters(&self) -> &dyn NovelChapterRepository;

    /// Persist a newly discovered novel's index and summary as a pair.
    ///
    /// The default writes the index first and the summary second as two
    /// separate statements. Backends that support transactions should
    /// override this so that either both records exist or neither does.
    async fn insert_novel_with_index(&self, info: &NovelInfo, index: &NovelIndex) -> Result<()> {
        self.indexes().insert(index).await?;
        self.novels().insert(info).await
    }
}

/// SQLite-backed [`NovelStore`]
pub struct SqliteNovelStore {
    pool: SqlitePool,
    novels: SqliteNovelInfoRepository,
    indexes: SqliteNovelIndexRepository,
    chapters: SqliteNovelChapterRepository,
}

impl SqliteNovelStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            novels: SqliteNovelInfoRepository::new(pool.clone()),
            indexes: SqliteNovelIndexRepository::new(pool.clone()),
            chapters: SqliteNovelChapterRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl NovelStore for SqliteNovelStore {
    fn novels(&self) -> &dyn NovelInfoRepository {
        &self.novels
    }

    fn indexes(&self) -> &dyn NovelIndexRepository {
        &self.indexes
    }

    fn chapters(&self) -> &dyn NovelChapterRepository {
        &self.chapters
    }

    async fn insert_novel_with_index(&self, info: &NovelInfo, index: &NovelIndex) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        insert_index(&mut *tx, index).await?;
        insert_info(&mut *tx, info).await?;

        tx.commit().await?;

        debug!(
            novel_id = %info.id,
            index_id = %index.id,
            chapters = index.len(),
            "Novel and index created"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::error::LibraryError;
    use crate::models::{ChapterRef, NovelIdentity};

    fn novel(id: &str, name: &str) -> (NovelInfo, NovelIndex) {
        let mut index = NovelIndex::new(format!("{}-index", id), id, 100);
        index.append(vec![ChapterRef::new(format!("{}-c1", id), "Prologue")], 100);

        let mut info = NovelInfo {
            id: id.to_string(),
            name: name.to_string(),
            author: "Li".to_string(),
            category: String::new(),
            status: "ongoing".to_string(),
            description: String::new(),
            cover: None,
            created_at: 100,
            updated_at: 100,
            latest_chapter_id: None,
            latest_chapter_name: None,
            index_id: index.id.clone(),
        };
        info.set_latest_chapter(index.latest());
        (info, index)
    }

    #[tokio::test]
    async fn test_insert_novel_with_index() {
        let store = SqliteNovelStore::new(create_test_pool().await.unwrap());
        let (info, index) = novel("n1", "Sword Song");

        store.insert_novel_with_index(&info, &index).await.unwrap();

        let stored = store
            .novels()
            .find_by_identity(&NovelIdentity::new("Sword Song", "Li"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.latest_chapter_name.as_deref(), Some("Prologue"));

        let stored_index = store.indexes().find_by_id(&stored.index_id).await.unwrap();
        assert_eq!(stored_index, Some(index));
    }

    #[tokio::test]
    async fn test_failed_summary_rolls_back_index() {
        let store = SqliteNovelStore::new(create_test_pool().await.unwrap());
        let (first, first_index) = novel("n1", "Sword Song");
        store
            .insert_novel_with_index(&first, &first_index)
            .await
            .unwrap();

        // Same identity under a new id violates UNIQUE(name, author)
        let (dup, dup_index) = novel("n2", "Sword Song");
        let result = store.insert_novel_with_index(&dup, &dup_index).await;
        assert!(matches!(result, Err(LibraryError::Database(_))));

        assert!(store.indexes().find_by_id("n2-index").await.unwrap().is_none());
        assert!(store.novels().find_by_id("n2").await.unwrap().is_none());
    }
}
