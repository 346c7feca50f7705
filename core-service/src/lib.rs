//! Mirror service façade and bootstrap helpers.
//!
//! This crate wires a host-provided [`MirrorConfig`] (source fetcher, id
//! generator, clock, optional matcher, database path) into the library store
//! and the sync engine. Hosts keep one [`MirrorService`] per mirrored source
//! and trigger runs through it.
//!
//! ```no_run
//! # async fn example(fetcher: std::sync::Arc<dyn core_service::Fetcher>) -> core_service::Result<()> {
//! use core_service::{MirrorConfig, MirrorService};
//!
//! let config = MirrorConfig::builder()
//!     .database_path("mirror.db")
//!     .source_key("recently-updated")
//!     .fetcher(fetcher)
//!     .build()?;
//!
//! let service = MirrorService::new(config).await?;
//! let report = service.run_once().await?;
//! println!("{} added, {} updated", report.stats.added, report.stats.updated);
//! # Ok(())
//! # }
//! ```

pub mod error;

pub use error::{CoreError, Result};

pub use bridge_traits::{ChapterEntry, Fetcher, NovelDetails};
pub use core_library::NovelStore;
pub use core_runtime::config::{MirrorConfig, MirrorConfigBuilder, SyncSettings};
pub use core_runtime::events::{CoreEvent, EventStream, LibraryEvent, SyncEvent};
pub use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
pub use core_sync::{ItemOutcome, RunReport, RunStats, SkipReason};

use std::sync::Arc;

use bridge_traits::ChapterMatcher;
use core_library::{create_pool, DatabaseConfig, SqliteNovelStore};
use core_runtime::events::{EventBus, DEFAULT_EVENT_BUFFER_SIZE};
use core_runtime::logging::strip_path;
use core_sync::{SimilarityMatcher, SyncContext, SyncEngine};
use tracing::info;

struct ServiceInner {
    source_key: String,
    store: Arc<SqliteNovelStore>,
    engine: SyncEngine,
    events: EventBus,
}

/// Primary façade exposed to host applications.
///
/// Cloning is cheap; clones drive the same engine, so a clone can
/// [`stop`](Self::stop) a run started through another.
#[derive(Clone)]
pub struct MirrorService {
    inner: Arc<ServiceInner>,
}

impl MirrorService {
    /// Open the database, apply migrations and assemble the sync engine.
    pub async fn new(config: MirrorConfig) -> Result<Self> {
        config.validate()?;

        let database_path = config.database_path.to_string_lossy().to_string();
        let db_config = if config.is_in_memory() {
            DatabaseConfig::in_memory()
        } else {
            DatabaseConfig::new(&config.database_path)
        };
        let pool = create_pool(db_config).await?;
        let store = Arc::new(SqliteNovelStore::new(pool));

        let matcher: Arc<dyn ChapterMatcher> = match config.matcher {
            Some(matcher) => matcher,
            None => Arc::new(SimilarityMatcher::new(config.sync.similarity_threshold)),
        };

        let events = EventBus::new(DEFAULT_EVENT_BUFFER_SIZE);
        let ctx = SyncContext {
            fetcher: config.fetcher,
            store: store.clone(),
            ids: config.id_generator,
            matcher,
            clock: config.clock,
            events: events.clone(),
        };
        let engine = SyncEngine::new(ctx, config.sync)?;

        info!(
            database = strip_path(&database_path),
            source_key = %config.source_key,
            "Mirror service ready"
        );

        Ok(Self {
            inner: Arc::new(ServiceInner {
                source_key: config.source_key,
                store,
                engine,
                events,
            }),
        })
    }

    /// Run one synchronization pass over the configured source key.
    pub async fn run_once(&self) -> Result<RunReport> {
        self.run(&self.inner.source_key).await
    }

    /// Run one synchronization pass over an explicit update-list key.
    pub async fn run(&self, source_key: &str) -> Result<RunReport> {
        Ok(self.inner.engine.run(source_key).await?)
    }

    /// Stop the run in progress, if any.
    pub async fn stop(&self) -> bool {
        self.inner.engine.stop().await
    }

    pub async fn is_running(&self) -> bool {
        self.inner.engine.is_running().await
    }

    /// Stream of engine and library events from now on.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.inner.events.subscribe())
    }

    /// Read access to the mirrored library.
    pub fn store(&self) -> Arc<dyn NovelStore> {
        self.inner.store.clone()
    }

    pub fn source_key(&self) -> &str {
        &self.inner.source_key
    }
}
