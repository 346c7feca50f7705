//! # Sync Engine
//!
//! Runs the item synchronizer over every novel a source lists as recently
//! updated.
//!
//! ## Overview
//!
//! A run:
//! 1. Fetches the update list for a source key
//! 2. Spawns one task per novel key, bounded by a semaphore
//! 3. Each task fetches the novel's details and hands them to the
//!    [`ItemSynchronizer`]
//! 4. Collects every task's [`ItemOutcome`] into a [`RunReport`]
//!
//! No item can fail the batch: fetch problems skip the item, anything else
//! fails it, and the remaining items carry on. Only an unavailable update
//! list fails the run as a whole.
//!
//! ## Cancellation
//!
//! [`SyncEngine::stop`] cancels the active run. Items that have not started
//! are reported as skipped; items in flight stop at their next chapter
//! boundary and keep what they already stored.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{SyncContext, SyncEngine, SyncSettings};
//!
//! # async fn example(ctx: SyncContext) -> core_sync::Result<()> {
//! let engine = SyncEngine::new(ctx, SyncSettings::default())?;
//! let report = engine.run("recently-updated").await?;
//! println!("{} novels added", report.stats.added);
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use bridge_traits::Fetcher;
use core_runtime::config::SyncSettings;
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::job::{ItemOutcome, ItemReport, RunId, RunReport, SkipReason};
use crate::synchronizer::{ItemSynchronizer, SyncContext};
use crate::{Result, SyncError};

pub struct SyncEngine {
    ctx: SyncContext,
    settings: SyncSettings,
    synchronizer: Arc<ItemSynchronizer>,
    /// Token of the run in progress, if any
    active: Arc<Mutex<Option<CancellationToken>>>,
}

impl SyncEngine {
    /// Create an engine.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidInput`] if `settings` do not validate.
    pub fn new(ctx: SyncContext, settings: SyncSettings) -> Result<Self> {
        settings.validate().map_err(|e| SyncError::InvalidInput {
            field: "sync_settings".to_string(),
            message: e.to_string(),
        })?;

        if !settings.is_rate_limited() {
            warn!("Pacing delay is zero; chapter fetches will not be rate limited");
        }

        let synchronizer = Arc::new(ItemSynchronizer::new(ctx.clone(), settings.clone()));

        Ok(Self {
            ctx,
            settings,
            synchronizer,
            active: Arc::new(Mutex::new(None)),
        })
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn events(&self) -> &EventBus {
        &self.ctx.events
    }

    /// Synchronize every novel listed under `source_key`.
    ///
    /// # Errors
    ///
    /// - [`SyncError::RunInProgress`] if this engine is already running
    /// - [`SyncError::Fetch`] if the update list cannot be fetched
    #[instrument(skip(self))]
    pub async fn run(&self, source_key: &str) -> Result<RunReport> {
        let cancel = {
            let mut active = self.active.lock().await;
            if active.is_some() {
                return Err(SyncError::RunInProgress {
                    source_key: source_key.to_string(),
                });
            }
            let token = CancellationToken::new();
            *active = Some(token.clone());
            token
        };
        let _guard = ActiveRunGuard {
            active: Arc::clone(&self.active),
        };

        self.execute(source_key, cancel).await
    }

    /// Cancel the run in progress. Returns `false` when nothing is running.
    pub async fn stop(&self) -> bool {
        match self.active.lock().await.as_ref() {
            Some(token) => {
                info!("Stopping sync run");
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn is_running(&self) -> bool {
        self.active.lock().await.is_some()
    }

    async fn execute(&self, source_key: &str, cancel: CancellationToken) -> Result<RunReport> {
        let run_id = RunId::new();
        let started = Instant::now();
        let started_at = self.ctx.clock.now();
        let site = self.ctx.fetcher.site_url().to_string();

        let keys = match self.ctx.fetcher.list_updates(source_key).await {
            Ok(keys) => dedupe(keys),
            Err(e) => {
                error!(run_id = %run_id, site = %site, "Failed to fetch update list: {}", e);
                self.ctx
                    .events
                    .emit(CoreEvent::Sync(SyncEvent::Failed {
                        run_id: run_id.to_string(),
                        message: e.to_string(),
                    }))
                    .ok();
                return Err(e.into());
            }
        };

        info!(run_id = %run_id, site = %site, items = keys.len(), "Starting sync run");

        self.ctx
            .events
            .emit(CoreEvent::Sync(SyncEvent::Started {
                run_id: run_id.to_string(),
                source_key: source_key.to_string(),
                site: site.clone(),
                items: keys.len() as u64,
            }))
            .ok();

        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrent_items));
        let worker = ItemWorker {
            run_id,
            fetcher: Arc::clone(&self.ctx.fetcher),
            synchronizer: Arc::clone(&self.synchronizer),
            events: self.ctx.events.clone(),
        };

        let handles: Vec<_> = keys
            .iter()
            .map(|key| {
                let worker = worker.clone();
                let key = key.clone();
                let semaphore = Arc::clone(&semaphore);
                let cancel = cancel.clone();
                tokio::spawn(async move { worker.run(key, semaphore, cancel).await })
            })
            .collect();

        let mut report = RunReport::new(run_id, source_key, site, started_at);

        for (key, handle) in keys.into_iter().zip(handles) {
            let item = match handle.await {
                Ok(item) => item,
                Err(join_error) => {
                    error!(source_key = %key, "Item worker panicked: {}", join_error);
                    let item = ItemReport {
                        source_key: key,
                        outcome: ItemOutcome::Failed {
                            error: format!("worker panicked: {}", join_error),
                        },
                        duration_ms: 0,
                    };
                    worker.emit_finished(&item);
                    item
                }
            };
            report.push(item);
        }

        report.finished_at = self.ctx.clock.now();
        report.duration_ms = started.elapsed().as_millis() as u64;
        report.cancelled = cancel.is_cancelled();

        let stats = report.stats;
        if report.cancelled {
            let items_processed = report
                .items
                .iter()
                .filter(|item| {
                    !matches!(
                        item.outcome,
                        ItemOutcome::Skipped {
                            reason: SkipReason::Cancelled
                        }
                    )
                })
                .count() as u64;

            warn!(run_id = %run_id, items_processed, "Sync run cancelled");
            self.ctx
                .events
                .emit(CoreEvent::Sync(SyncEvent::Cancelled {
                    run_id: run_id.to_string(),
                    items_processed,
                }))
                .ok();
        } else {
            info!(
                run_id = %run_id,
                added = stats.added,
                updated = stats.updated,
                unchanged = stats.unchanged,
                diverged = stats.diverged,
                skipped = stats.skipped,
                failed = stats.failed,
                chapters_added = stats.chapters_added,
                duration_ms = report.duration_ms,
                "Sync run completed"
            );
            self.ctx
                .events
                .emit(CoreEvent::Sync(SyncEvent::Completed {
                    run_id: run_id.to_string(),
                    added: stats.added,
                    updated: stats.updated,
                    unchanged: stats.unchanged,
                    diverged: stats.diverged,
                    skipped: stats.skipped,
                    failed: stats.failed,
                    chapters_added: stats.chapters_added,
                    chapters_skipped: stats.chapters_skipped,
                    duration_ms: report.duration_ms,
                }))
                .ok();
        }

        Ok(report)
    }
}

/// Clears the active run slot when a run ends, including when its future is dropped.
struct ActiveRunGuard {
    active: Arc<Mutex<Option<CancellationToken>>>,
}

impl Drop for ActiveRunGuard {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.try_lock() {
            *active = None;
            return;
        }

        let active = Arc::clone(&self.active);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                *active.lock().await = None;
            });
        }
    }
}

/// Per-task state for synchronizing one key
#[derive(Clone)]
struct ItemWorker {
    run_id: RunId,
    fetcher: Arc<dyn Fetcher>,
    synchronizer: Arc<ItemSynchronizer>,
    events: EventBus,
}

impl ItemWorker {
    async fn run(
        self,
        source_key: String,
        semaphore: Arc<Semaphore>,
        cancel: CancellationToken,
    ) -> ItemReport {
        let started = Instant::now();

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => ItemOutcome::Skipped {
                reason: SkipReason::Cancelled,
            },
            permit = semaphore.acquire_owned() => match permit {
                Ok(_permit) => self.process(&source_key, &cancel).await,
                Err(e) => ItemOutcome::Failed {
                    error: format!("concurrency limiter closed: {}", e),
                },
            },
        };

        let item = ItemReport {
            source_key,
            outcome,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        self.emit_finished(&item);
        item
    }

    async fn process(&self, source_key: &str, cancel: &CancellationToken) -> ItemOutcome {
        let site = self.fetcher.site_url();

        if cancel.is_cancelled() {
            return ItemOutcome::Skipped {
                reason: SkipReason::Cancelled,
            };
        }

        let details = match self.fetcher.get_novel_details(source_key).await {
            Ok(details) => details,
            Err(e) => {
                warn!(source_key, site, "Failed to fetch novel details: {}", e);
                return ItemOutcome::Skipped {
                    reason: SkipReason::FetchFailed(e.to_string()),
                };
            }
        };

        match self.synchronizer.sync(source_key, &details, cancel).await {
            Ok(outcome) => {
                debug!(source_key, outcome = outcome.kind(), "Item finished");
                outcome
            }
            Err(SyncError::Fetch(e)) => {
                warn!(source_key, site, novel = %details.name, "Failed to fetch chapter list: {}", e);
                ItemOutcome::Skipped {
                    reason: SkipReason::FetchFailed(e.to_string()),
                }
            }
            Err(SyncError::IndexMissing { novel_id, index_id }) => {
                error!(
                    source_key,
                    site,
                    novel_id = %novel_id,
                    "Index {} of {} is missing; skipping",
                    index_id,
                    details.name
                );
                ItemOutcome::Skipped {
                    reason: SkipReason::IndexMissing { index_id },
                }
            }
            Err(SyncError::Cancelled) => ItemOutcome::Skipped {
                reason: SkipReason::Cancelled,
            },
            Err(e) => {
                error!(source_key, site, novel = %details.name, "Item failed: {}", e);
                ItemOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    fn emit_finished(&self, item: &ItemReport) {
        self.events
            .emit(CoreEvent::Sync(SyncEvent::ItemFinished {
                run_id: self.run_id.to_string(),
                source_key: item.source_key.clone(),
                outcome: item.outcome.kind().to_string(),
                chapters_added: item.outcome.chapters_added(),
            }))
            .ok();
    }
}

/// Drop repeated keys, keeping first-seen order
fn dedupe(keys: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    keys.into_iter()
        .filter(|key| seen.insert(key.clone()))
        .collect()
}
