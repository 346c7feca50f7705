//! # Item Synchronizer
//!
//! Brings one novel of the source in line with the local mirror.
//!
//! ## Workflow
//!
//! ### Add path (identity not yet stored)
//! 1. Allocate novel and index ids
//! 2. Download the cover (failure only costs the cover)
//! 3. Fetch the chapter list, then every chapter in order, persisting each
//! 4. Persist index and summary together
//!
//! ### Update path (identity already stored)
//! 1. Load the index the summary points at
//! 2. Fetch the chapter list and diff it against the index
//! 3. Fetch and persist the chapters past the anchor
//! 4. Append their refs to the index, then refresh the summary
//!
//! A chapter whose text cannot be fetched is logged and skipped; the
//! remaining chapters are still mirrored.
//!
//! Items resolving to the same [`NovelIdentity`] run one after another, so
//! two source keys listing one novel never overwrite each other's index.

use std::collections::HashMap;
use std::sync::Arc;

use bridge_traits::error::FetchResult;
use bridge_traits::{ChapterEntry, ChapterMatcher, Clock, Fetcher, IdGenerator, NovelDetails};
use core_library::{ChapterRef, NovelChapter, NovelIdentity, NovelIndex, NovelInfo, NovelStore};
use core_runtime::config::SyncSettings;
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::diff::{compute_update_start, UpdatePlan};
use crate::job::ItemOutcome;
use crate::{Result, SyncError};

/// Collaborators shared by every item of a run
#[derive(Clone)]
pub struct SyncContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub store: Arc<dyn NovelStore>,
    pub ids: Arc<dyn IdGenerator>,
    pub matcher: Arc<dyn ChapterMatcher>,
    pub clock: Arc<dyn Clock>,
    pub events: EventBus,
}

/// Chapters gathered for one item
#[derive(Debug, Default)]
struct ChapterBatch {
    refs: Vec<ChapterRef>,
    skipped: u64,
    cancelled: bool,
}

pub struct ItemSynchronizer {
    ctx: SyncContext,
    settings: SyncSettings,
    novel_locks: Mutex<HashMap<NovelIdentity, Arc<Mutex<()>>>>,
}

impl ItemSynchronizer {
    pub fn new(ctx: SyncContext, settings: SyncSettings) -> Self {
        Self {
            ctx,
            settings,
            novel_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Synchronize the novel described by `details`.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Fetch`] if the chapter list cannot be fetched
    /// - [`SyncError::IndexMissing`] if a tracked novel has lost its index
    /// - [`SyncError::Cancelled`] if the run was stopped before any chapter was collected
    /// - [`SyncError::Library`] if a store write fails
    #[instrument(skip(self, details, cancel), fields(novel = %details.name, author = %details.author))]
    pub async fn sync(
        &self,
        source_key: &str,
        details: &NovelDetails,
        cancel: &CancellationToken,
    ) -> Result<ItemOutcome> {
        let identity = NovelIdentity::new(details.name.clone(), details.author.clone());
        let guard = self.lock_novel(&identity).await;

        let result = match self.ctx.store.novels().find_by_identity(&identity).await {
            Ok(Some(info)) => self.update_novel(source_key, details, info, cancel).await,
            Ok(None) => self.add_novel(source_key, details, cancel).await,
            Err(e) => Err(e.into()),
        };

        drop(guard);
        self.release_novel(&identity).await;
        result
    }

    /// Wait until no other item is working on `identity`.
    async fn lock_novel(&self, identity: &NovelIdentity) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.novel_locks.lock().await;
            locks.entry(identity.clone()).or_default().clone()
        };

        if lock.try_lock().is_err() {
            debug!("Waiting for another item of the same novel");
        }
        lock.lock_owned().await
    }

    async fn release_novel(&self, identity: &NovelIdentity) {
        let mut locks = self.novel_locks.lock().await;
        if let Some(lock) = locks.get(identity) {
            // Only the map still holds it
            if Arc::strong_count(lock) == 1 {
                locks.remove(identity);
            }
        }
    }

    async fn add_novel(
        &self,
        source_key: &str,
        details: &NovelDetails,
        cancel: &CancellationToken,
    ) -> Result<ItemOutcome> {
        let novel_id = self.ctx.ids.next_id();
        let index_id = self.ctx.ids.next_id();

        let cover = self.download_cover(source_key, details).await;
        let entries = self
            .ctx
            .fetcher
            .list_chapters(source_key, &details.chapter_index)
            .await?;

        debug!("New novel with {} listed chapters", entries.len());

        let batch = self
            .fetch_chapters(source_key, details, &novel_id, &entries, cancel)
            .await?;

        let now = self.ctx.clock.unix_timestamp();
        let mut index = NovelIndex::new(index_id.clone(), novel_id.clone(), now);
        index.append(batch.refs, now);

        let mut info = NovelInfo {
            id: novel_id.clone(),
            name: details.name.clone(),
            author: details.author.clone(),
            category: details.category.clone(),
            status: details.status.clone(),
            description: details.description.clone(),
            cover,
            created_at: now,
            updated_at: now,
            latest_chapter_id: None,
            latest_chapter_name: None,
            index_id,
        };
        info.set_latest_chapter(index.latest());

        self.ctx
            .store
            .insert_novel_with_index(&info, &index)
            .await?;

        let chapters_added = index.len() as u64;
        info!(
            novel_id = %novel_id,
            chapters = chapters_added,
            skipped = batch.skipped,
            "Added novel {} by {}",
            info.name,
            info.author
        );

        self.ctx
            .events
            .emit(CoreEvent::Library(LibraryEvent::NovelAdded {
                novel_id: novel_id.clone(),
                name: info.name.clone(),
                author: info.author.clone(),
                chapters: chapters_added,
            }))
            .ok();

        Ok(ItemOutcome::Added {
            novel_id,
            chapters_added,
            chapters_skipped: batch.skipped,
        })
    }

    async fn update_novel(
        &self,
        source_key: &str,
        details: &NovelDetails,
        mut info: NovelInfo,
        cancel: &CancellationToken,
    ) -> Result<ItemOutcome> {
        let mut index = self
            .ctx
            .store
            .indexes()
            .find_by_id(&info.index_id)
            .await?
            .ok_or_else(|| SyncError::IndexMissing {
                novel_id: info.id.clone(),
                index_id: info.index_id.clone(),
            })?;

        let entries = self
            .ctx
            .fetcher
            .list_chapters(source_key, &details.chapter_index)
            .await?;
        let listed: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();

        let plan = compute_update_start(&index.chapter_names(), &listed, self.ctx.matcher.as_ref());

        match plan {
            UpdatePlan::Diverged => {
                error!(
                    novel_id = %info.id,
                    stored = index.len(),
                    listed = entries.len(),
                    site = self.ctx.fetcher.site_url(),
                    "Chapter list of {} shares no anchor with the stored index; not updating",
                    info.name
                );
                self.ctx
                    .events
                    .emit(CoreEvent::Library(LibraryEvent::IndexDiverged {
                        novel_id: info.id.clone(),
                        name: info.name.clone(),
                    }))
                    .ok();
                return Ok(ItemOutcome::Diverged { novel_id: info.id });
            }
            UpdatePlan::UpToDate { .. } => {
                debug!(novel_id = %info.id, "Up to date");
                return Ok(ItemOutcome::Unchanged {
                    novel_id: info.id,
                    chapters_skipped: 0,
                });
            }
            UpdatePlan::Cold | UpdatePlan::Append { .. } => {}
        }

        let start = plan.start_index();
        debug!(
            novel_id = %info.id,
            start,
            new_chapters = entries.len() - start,
            "Fetching new chapters"
        );

        let batch = self
            .fetch_chapters(source_key, details, &info.id, &entries[start..], cancel)
            .await?;

        if batch.refs.is_empty() {
            warn!(
                novel_id = %info.id,
                skipped = batch.skipped,
                "No new chapter of {} could be fetched",
                info.name
            );
            return Ok(ItemOutcome::Unchanged {
                novel_id: info.id,
                chapters_skipped: batch.skipped,
            });
        }

        let now = self.ctx.clock.unix_timestamp();
        let chapters_added = batch.refs.len() as u64;
        index.append(batch.refs, now);
        self.ctx.store.indexes().update(&index).await?;

        info.status = details.status.clone();
        info.updated_at = now;
        info.set_latest_chapter(index.latest());
        self.ctx.store.novels().update(&info).await?;

        info!(
            novel_id = %info.id,
            added = chapters_added,
            skipped = batch.skipped,
            partial = batch.cancelled,
            "Appended chapters to {}",
            info.name
        );

        self.ctx
            .events
            .emit(CoreEvent::Library(LibraryEvent::ChaptersAppended {
                novel_id: info.id.clone(),
                name: info.name.clone(),
                count: chapters_added,
                latest_chapter: info.latest_chapter_name.clone(),
            }))
            .ok();

        Ok(ItemOutcome::Updated {
            novel_id: info.id,
            chapters_added,
            chapters_skipped: batch.skipped,
        })
    }

    async fn download_cover(&self, source_key: &str, details: &NovelDetails) -> Option<Vec<u8>> {
        let url = details.image_url.as_deref().filter(|url| !url.trim().is_empty())?;

        match self.ctx.fetcher.download_image(url).await {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(e) => {
                warn!(
                    source_key,
                    site = self.ctx.fetcher.site_url(),
                    "Cover download failed, storing {} without cover: {}",
                    details.name,
                    e
                );
                None
            }
        }
    }

    /// Fetch and persist `entries` in order.
    ///
    /// Cancellation is checked before each chapter. A cancelled batch keeps
    /// what it collected so the caller can still record it.
    async fn fetch_chapters(
        &self,
        source_key: &str,
        details: &NovelDetails,
        novel_id: &str,
        entries: &[ChapterEntry],
        cancel: &CancellationToken,
    ) -> Result<ChapterBatch> {
        let mut batch = ChapterBatch::default();
        let site = self.ctx.fetcher.site_url();

        for entry in entries {
            if cancel.is_cancelled() {
                batch.cancelled = true;
                break;
            }

            match self.fetch_content(source_key, &details.chapter_index, entry).await {
                Ok(content) => {
                    let chapter = NovelChapter::new(
                        self.ctx.ids.next_id(),
                        novel_id,
                        entry.name.clone(),
                        content,
                        self.ctx.clock.unix_timestamp(),
                    );
                    self.ctx.store.chapters().insert(novel_id, &chapter).await?;
                    batch.refs.push(chapter.as_ref_entry());
                }
                Err(e) => {
                    warn!(
                        source_key,
                        site,
                        chapter = %entry.name,
                        handle = %entry.handle,
                        "Skipping chapter of {}: {}",
                        details.name,
                        e
                    );
                    batch.skipped += 1;
                    self.ctx
                        .events
                        .emit(CoreEvent::Library(LibraryEvent::ChapterSkipped {
                            source_key: source_key.to_string(),
                            novel_name: details.name.clone(),
                            chapter_name: entry.name.clone(),
                            reason: e.to_string(),
                        }))
                        .ok();
                }
            }

            self.pace(cancel).await;
        }

        if batch.cancelled && batch.refs.is_empty() {
            return Err(SyncError::Cancelled);
        }

        Ok(batch)
    }

    /// Fetch one chapter's text, retrying transient failures.
    async fn fetch_content(
        &self,
        source_key: &str,
        chapter_index: &str,
        entry: &ChapterEntry,
    ) -> FetchResult<String> {
        let mut attempt: u32 = 0;

        loop {
            match self
                .ctx
                .fetcher
                .get_content(source_key, chapter_index, &entry.handle)
                .await
            {
                Ok(content) => return Ok(content),
                Err(e) if e.is_transient() && attempt < self.settings.chapter_retry_attempts => {
                    let backoff = self
                        .settings
                        .retry_backoff
                        .saturating_mul(1u32 << attempt.min(16));
                    debug!(
                        chapter = %entry.name,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        "Retrying chapter after transient error: {}",
                        e
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn pace(&self, cancel: &CancellationToken) {
        if !self.settings.is_rate_limited() {
            return;
        }
        let delay = self.settings.pacing_delay;

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => {}
        }
    }
}
