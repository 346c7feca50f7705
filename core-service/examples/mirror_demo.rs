//! Mirror service demonstration
//!
//! Mirrors a small in-process "site" into an in-memory library, then lets
//! the site publish two more chapters and mirrors again.
//!
//! Run with:
//! ```bash
//! cargo run -p core-service --example mirror_demo
//!
//! # JSON logs
//! cargo run -p core-service --example mirror_demo -- json
//! ```

use async_trait::async_trait;
use bridge_traits::error::FetchResult;
use bridge_traits::time::LogLevel;
use bridge_traits::FetchError;
use bytes::Bytes;
use core_service::{
    init_logging, ChapterEntry, CoreEvent, Fetcher, LogFormat, LoggingConfig, MirrorConfig,
    MirrorService, NovelDetails, RunReport, SyncSettings,
};
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;

/// Site with a fixed catalogue kept in memory
struct DemoSite {
    catalogue: RwLock<HashMap<String, (NovelDetails, Vec<String>)>>,
}

impl DemoSite {
    fn new() -> Self {
        let mut catalogue = HashMap::new();
        for (key, name, author, chapters) in [
            ("demo/1", "The Ninth Gate", "Wen", 3),
            ("demo/2", "Salt and Iron", "Kade", 2),
        ] {
            let details = NovelDetails {
                name: name.to_string(),
                author: author.to_string(),
                category: "fantasy".to_string(),
                status: "ongoing".to_string(),
                description: format!("A demo novel by {}", author),
                image_url: None,
                chapter_index: format!("{}/toc", key),
            };
            let titles = (1..=chapters).map(|n| format!("Chapter {}", n)).collect();
            catalogue.insert(key.to_string(), (details, titles));
        }
        Self {
            catalogue: RwLock::new(catalogue),
        }
    }

    async fn publish(&self, key: &str, title: &str) {
        if let Some((_, titles)) = self.catalogue.write().await.get_mut(key) {
            titles.push(title.to_string());
        }
    }
}

#[async_trait]
impl Fetcher for DemoSite {
    fn site_url(&self) -> &str {
        "https://demo.invalid"
    }

    async fn list_updates(&self, _source_key: &str) -> FetchResult<Vec<String>> {
        let mut keys: Vec<String> = self.catalogue.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn get_novel_details(&self, novel_key: &str) -> FetchResult<NovelDetails> {
        self.catalogue
            .read()
            .await
            .get(novel_key)
            .map(|(details, _)| details.clone())
            .ok_or_else(|| FetchError::NotFound(novel_key.to_string()))
    }

    async fn list_chapters(&self, novel_key: &str, _index: &str) -> FetchResult<Vec<ChapterEntry>> {
        self.catalogue
            .read()
            .await
            .get(novel_key)
            .map(|(_, titles)| {
                titles
                    .iter()
                    .enumerate()
                    .map(|(i, title)| ChapterEntry::new(title.clone(), i.to_string()))
                    .collect()
            })
            .ok_or_else(|| FetchError::NotFound(novel_key.to_string()))
    }

    async fn get_content(&self, novel_key: &str, _index: &str, handle: &str) -> FetchResult<String> {
        Ok(format!("Text of {} chapter #{}", novel_key, handle))
    }

    async fn download_image(&self, url: &str) -> FetchResult<Bytes> {
        Err(FetchError::NotFound(url.to_string()))
    }
}

fn print_report(label: &str, report: &RunReport) {
    let stats = &report.stats;
    println!(
        "{}: added={} updated={} unchanged={} skipped={} failed={} chapters={}",
        label,
        stats.added,
        stats.updated,
        stats.unchanged,
        stats.skipped,
        stats.failed,
        stats.chapters_added
    );
    for item in &report.items {
        println!("  {} -> {}", item.source_key, item.outcome.kind());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let format = match env::args().nth(1).as_deref() {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        _ => LogFormat::Pretty,
    };
    init_logging(
        LoggingConfig::default()
            .with_format(format)
            .with_level(LogLevel::Info),
    )?;

    let site = Arc::new(DemoSite::new());
    let config = MirrorConfig::builder()
        .database_path(":memory:")
        .source_key("latest")
        .fetcher(site.clone())
        .sync_settings(SyncSettings::default().with_pacing_delay(Duration::from_millis(20)))
        .build()?;

    let service = MirrorService::new(config).await?;

    let mut events = service.subscribe();
    let listener = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let CoreEvent::Library(library_event) = &event {
                info!(event = ?library_event, "library changed");
            }
        }
    });

    let first = service.run_once().await?;
    print_report("first run", &first);

    site.publish("demo/1", "Chapter 4").await;
    site.publish("demo/1", "Chapter 5").await;

    let second = service.run_once().await?;
    print_report("second run", &second);

    drop(service);
    listener.abort();
    Ok(())
}
