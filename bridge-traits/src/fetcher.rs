//! Source Site Abstraction
//!
//! A [`Fetcher`] knows how to talk to one source site: which novels changed
//! recently, what a novel's details page says, which chapters it lists and
//! what each chapter contains. Network access and HTML parsing live entirely
//! behind this trait.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::FetchResult;

/// Novel details as scraped from the source, before it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NovelDetails {
    pub name: String,
    pub author: String,
    /// Categorical tag (genre or board) as the site labels it
    pub category: String,
    /// Serialization state, e.g. "ongoing" or "complete"
    pub status: String,
    pub description: String,
    pub image_url: Option<String>,
    /// Opaque locator for the chapter list page
    pub chapter_index: String,
}

/// One entry of a chapter list, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterEntry {
    pub name: String,
    /// Opaque handle passed back to [`Fetcher::get_content`]
    pub handle: String,
}

impl ChapterEntry {
    pub fn new(name: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handle: handle.into(),
        }
    }
}

/// Site-specific access to novels and chapters.
///
/// Every call is a suspension point and may fail with a
/// [`FetchError`](crate::error::FetchError).
///
/// # Example
///
/// ```ignore
/// use bridge_traits::fetcher::Fetcher;
///
/// async fn first_chapter(fetcher: &dyn Fetcher, key: &str) -> FetchResult<String> {
///     let details = fetcher.get_novel_details(key).await?;
///     let chapters = fetcher.list_chapters(key, &details.chapter_index).await?;
///     fetcher
///         .get_content(key, &details.chapter_index, &chapters[0].handle)
///         .await
/// }
/// ```
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Base URL of the site, used to label log lines and reports
    fn site_url(&self) -> &str;

    /// Keys of the novels listed under `source_key` (typically a "recently updated" page)
    async fn list_updates(&self, source_key: &str) -> FetchResult<Vec<String>>;

    /// Details of a single novel
    async fn get_novel_details(&self, novel_key: &str) -> FetchResult<NovelDetails>;

    /// Full chapter list of a novel, in reading order
    async fn list_chapters(
        &self,
        novel_key: &str,
        chapter_index: &str,
    ) -> FetchResult<Vec<ChapterEntry>>;

    /// Text of one chapter
    async fn get_content(
        &self,
        novel_key: &str,
        chapter_index: &str,
        handle: &str,
    ) -> FetchResult<String>;

    /// Raw bytes of an image (cover art)
    async fn download_image(&self, url: &str) -> FetchResult<Bytes>;
}
