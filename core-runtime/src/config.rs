//! # Mirror Configuration Module
//!
//! Builder-constructed configuration for one mirror process.
//!
//! ## Overview
//!
//! A [`MirrorConfig`] holds the collaborators the engine consumes and the
//! tuning knobs of a run. The builder fails fast: a missing required
//! capability is reported at `build()` time with an actionable message,
//! never discovered halfway through a run.
//!
//! ## Required
//!
//! - `database_path` - SQLite file backing the store (`:memory:` for tests)
//! - `source_key` - The update-list key passed to `Fetcher::list_updates`
//! - `Fetcher` - Site access; there is no default
//!
//! ## Optional (with defaults)
//!
//! - `IdGenerator` - [`UuidV7Generator`]
//! - `Clock` - [`SystemClock`]
//! - `ChapterMatcher` - left unset here; the service installs the
//!   similarity matcher configured by [`SyncSettings::similarity_threshold`]
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{MirrorConfig, SyncSettings};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = MirrorConfig::builder()
//!     .database_path("/srv/mirror/novels.db")
//!     .source_key("https://example.com/updates")
//!     .fetcher(Arc::new(MySiteFetcher::new()))
//!     .sync_settings(SyncSettings::default().with_pacing_delay(Duration::from_secs(1)))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{ChapterMatcher, Clock, Fetcher, IdGenerator, SystemClock, UuidV7Generator};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on the pacing delay between chapter fetches
pub const MAX_PACING_DELAY: Duration = Duration::from_secs(60);

/// Tuning knobs of a synchronization run.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    /// Items synchronized at the same time
    pub max_concurrent_items: usize,

    /// Wait after every chapter fetch, successful or not.
    ///
    /// Zero turns rate limiting off entirely. Only test fixtures and local
    /// fetchers should use it; the engine logs a warning when it does.
    pub pacing_delay: Duration,

    /// Extra attempts per chapter after the first failure. 0 disables retry.
    pub chapter_retry_attempts: u32,

    /// Delay before the first retry; doubles on each further attempt
    pub retry_backoff: Duration,

    /// Minimum similarity score at which two chapter titles are the same chapter
    pub similarity_threshold: f64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_concurrent_items: 4,
            pacing_delay: Duration::from_millis(500),
            chapter_retry_attempts: 0,
            retry_backoff: Duration::from_secs(1),
            similarity_threshold: 0.85,
        }
    }
}

impl SyncSettings {
    pub fn with_max_concurrent_items(mut self, max: usize) -> Self {
        self.max_concurrent_items = max;
        self
    }

    pub fn with_pacing_delay(mut self, delay: Duration) -> Self {
        self.pacing_delay = delay;
        self
    }

    pub fn with_chapter_retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.chapter_retry_attempts = attempts;
        self.retry_backoff = backoff;
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Whether chapter fetches are spaced by a pacing delay
    pub fn is_rate_limited(&self) -> bool {
        !self.pacing_delay.is_zero()
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_items == 0 {
            return Err(Error::Config(
                "max_concurrent_items must be greater than 0".to_string(),
            ));
        }

        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(Error::Config(format!(
                "similarity_threshold must be in (0, 1], got {}",
                self.similarity_threshold
            )));
        }

        if self.pacing_delay > MAX_PACING_DELAY {
            return Err(Error::Config(
                "pacing_delay exceeds maximum of 60 seconds".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration of one mirror process. Use [`MirrorConfigBuilder`].
#[derive(Clone)]
pub struct MirrorConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Key handed to `Fetcher::list_updates` on every run
    pub source_key: String,

    pub fetcher: Arc<dyn Fetcher>,

    pub id_generator: Arc<dyn IdGenerator>,

    /// Custom title matcher; `None` selects the default similarity matcher
    pub matcher: Option<Arc<dyn ChapterMatcher>>,

    pub clock: Arc<dyn Clock>,

    pub sync: SyncSettings,
}

impl std::fmt::Debug for MirrorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorConfig")
            .field("database_path", &self.database_path)
            .field("source_key", &self.source_key)
            .field("fetcher", &self.fetcher.site_url())
            .field("id_generator", &"IdGenerator { ... }")
            .field(
                "matcher",
                &self.matcher.as_ref().map(|_| "ChapterMatcher { ... }"),
            )
            .field("clock", &"Clock { ... }")
            .field("sync", &self.sync)
            .finish()
    }
}

impl MirrorConfig {
    pub fn builder() -> MirrorConfigBuilder {
        MirrorConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if self.source_key.trim().is_empty() {
            return Err(Error::Config("Source key cannot be empty".to_string()));
        }

        self.sync.validate()
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == ":memory:"
    }
}

fn fetcher_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "Fetcher".to_string(),
        message: "A Fetcher implementation is required to read the source site. \
                 Implement bridge_traits::Fetcher for the site (update list, novel details, \
                 chapter list, chapter content, cover download) and pass it via .fetcher()."
            .to_string(),
    }
}

/// Builder for [`MirrorConfig`].
#[derive(Default)]
pub struct MirrorConfigBuilder {
    database_path: Option<PathBuf>,
    source_key: Option<String>,
    fetcher: Option<Arc<dyn Fetcher>>,
    id_generator: Option<Arc<dyn IdGenerator>>,
    matcher: Option<Arc<dyn ChapterMatcher>>,
    clock: Option<Arc<dyn Clock>>,
    sync: Option<SyncSettings>,
}

impl MirrorConfigBuilder {
    /// Sets the database path. Use `":memory:"` for a throwaway store.
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    pub fn source_key(mut self, key: impl Into<String>) -> Self {
        self.source_key = Some(key.into());
        self
    }

    /// Sets the site fetcher (required).
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn id_generator(mut self, generator: Arc<dyn IdGenerator>) -> Self {
        self.id_generator = Some(generator);
        self
    }

    /// Overrides the chapter title matcher.
    ///
    /// When set, [`SyncSettings::similarity_threshold`] is not consulted.
    pub fn matcher(mut self, matcher: Arc<dyn ChapterMatcher>) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn sync_settings(mut self, settings: SyncSettings) -> Self {
        self.sync = Some(settings);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `database_path` or `source_key` is missing or a
    ///   setting is out of range
    /// - [`Error::CapabilityMissing`] if no fetcher was provided
    pub fn build(self) -> Result<MirrorConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let source_key = self.source_key.ok_or_else(|| {
            Error::Config("Source key is required. Use .source_key() to set it.".to_string())
        })?;

        let fetcher = self.fetcher.ok_or_else(fetcher_missing_error)?;

        let config = MirrorConfig {
            database_path,
            source_key,
            fetcher,
            id_generator: self
                .id_generator
                .unwrap_or_else(|| Arc::new(UuidV7Generator)),
            matcher: self.matcher,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            sync: self.sync.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{ChapterEntry, ExactMatcher, FetchError, FixedClock, NovelDetails};
    use bytes::Bytes;

    struct MockFetcher;

    #[async_trait]
    impl Fetcher for MockFetcher {
        fn site_url(&self) -> &str {
            "https://novels.example"
        }

        async fn list_updates(&self, _source_key: &str) -> std::result::Result<Vec<String>, FetchError> {
            Ok(Vec::new())
        }

        async fn get_novel_details(
            &self,
            novel_key: &str,
        ) -> std::result::Result<NovelDetails, FetchError> {
            Err(FetchError::NotFound(novel_key.to_string()))
        }

        async fn list_chapters(
            &self,
            _novel_key: &str,
            _chapter_index: &str,
        ) -> std::result::Result<Vec<ChapterEntry>, FetchError> {
            Ok(Vec::new())
        }

        async fn get_content(
            &self,
            _novel_key: &str,
            _chapter_index: &str,
            handle: &str,
        ) -> std::result::Result<String, FetchError> {
            Err(FetchError::NotFound(handle.to_string()))
        }

        async fn download_image(&self, url: &str) -> std::result::Result<Bytes, FetchError> {
            Err(FetchError::NotFound(url.to_string()))
        }
    }

    fn complete_builder() -> MirrorConfigBuilder {
        MirrorConfig::builder()
            .database_path("/tmp/mirror.db")
            .source_key("https://novels.example/updates")
            .fetcher(Arc::new(MockFetcher))
    }

    #[test]
    fn test_builder_with_all_required_fields() {
        let config = complete_builder().build().unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/mirror.db"));
        assert_eq!(config.source_key, "https://novels.example/updates");
        assert!(config.matcher.is_none());
        assert_eq!(config.sync, SyncSettings::default());
        assert!(!config.is_in_memory());
    }

    #[test]
    fn test_builder_requires_database_path() {
        let result = MirrorConfig::builder()
            .source_key("k")
            .fetcher(Arc::new(MockFetcher))
            .build();

        match result {
            Err(Error::Config(msg)) => assert!(msg.contains("Database path is required")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_builder_requires_source_key() {
        let result = MirrorConfig::builder()
            .database_path(":memory:")
            .fetcher(Arc::new(MockFetcher))
            .build();

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_requires_fetcher() {
        let result = MirrorConfig::builder()
            .database_path(":memory:")
            .source_key("k")
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, message }) => {
                assert_eq!(capability, "Fetcher");
                assert!(message.contains(".fetcher()"));
            }
            other => panic!("expected missing capability, got {:?}", other),
        }
    }

    #[test]
    fn test_builder_rejects_blank_source_key() {
        let result = complete_builder().source_key("   ").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_with_overrides() {
        let config = complete_builder()
            .database_path(":memory:")
            .matcher(Arc::new(ExactMatcher))
            .clock(Arc::new(FixedClock::at_unix(42)))
            .sync_settings(SyncSettings::default().with_max_concurrent_items(8))
            .build()
            .unwrap();

        assert!(config.is_in_memory());
        assert!(config.matcher.is_some());
        assert_eq!(config.clock.unix_timestamp(), 42);
        assert_eq!(config.sync.max_concurrent_items, 8);
    }

    #[test]
    fn test_sync_settings_defaults() {
        let settings = SyncSettings::default();
        assert_eq!(settings.max_concurrent_items, 4);
        assert_eq!(settings.pacing_delay, Duration::from_millis(500));
        assert_eq!(settings.chapter_retry_attempts, 0);
        assert_eq!(settings.retry_backoff, Duration::from_secs(1));
        assert!((settings.similarity_threshold - 0.85).abs() < f64::EPSILON);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let settings = SyncSettings::default().with_max_concurrent_items(0);
        assert!(matches!(settings.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_threshold_out_of_range() {
        for threshold in [0.0, -0.1, 1.01, f64::NAN] {
            let settings = SyncSettings::default().with_similarity_threshold(threshold);
            assert!(settings.validate().is_err(), "threshold {}", threshold);
        }
        let settings = SyncSettings::default().with_similarity_threshold(1.0);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_excessive_pacing() {
        let settings = SyncSettings::default().with_pacing_delay(Duration::from_secs(61));
        assert!(settings.validate().is_err());

        let settings = SyncSettings::default().with_pacing_delay(MAX_PACING_DELAY);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_zero_pacing_disables_rate_limiting() {
        let settings = SyncSettings::default().with_pacing_delay(Duration::ZERO);
        assert!(settings.validate().is_ok());
        assert!(!settings.is_rate_limited());
        assert!(SyncSettings::default().is_rate_limited());
    }

    #[test]
    fn test_config_debug_hides_collaborators() {
        let config = complete_builder().build().unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("novels.example"));
        assert!(debug.contains("IdGenerator { ... }"));
    }
}
