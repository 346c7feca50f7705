//! # Event Bus System
//!
//! Typed events broadcast over `tokio::sync::broadcast` so hosts can follow a
//! run (progress display, alerting on skipped chapters) without polling the
//! store.
//!
//! ## Overview
//!
//! - **Event Types**: [`SyncEvent`] for run lifecycle, [`LibraryEvent`] for
//!   store changes, both wrapped in [`CoreEvent`]
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Receiver wrapper with optional filtering
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
//!
//! let bus = EventBus::new(64);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Library(LibraryEvent::IndexDiverged {
//!     novel_id: "n1".to_string(),
//!     name: "Sword Song".to_string(),
//! }))
//! .ok();
//!
//! assert!(rx.try_recv().is_ok());
//! ```
//!
//! ## Error Handling
//!
//! `emit` fails only when nobody is subscribed. Publishers treat that as a
//! no-op (`.ok()`); a run never depends on being observed.
//!
//! Subscribers may see `RecvError::Lagged(n)` when they fall more than the
//! buffer size behind. That is non-fatal; `RecvError::Closed` means shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

// ============================================================================
// Core Event Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Run lifecycle
    Sync(SyncEvent),
    /// Store changes and per-chapter problems
    Library(LibraryEvent),
}

impl CoreEvent {
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Library(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Library(LibraryEvent::IndexDiverged { .. }) => EventSeverity::Error,
            CoreEvent::Library(LibraryEvent::ChapterSkipped { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::ItemFinished { outcome, .. })
                if outcome == "failed" || outcome == "skipped" =>
            {
                EventSeverity::Warning
            }
            CoreEvent::Sync(SyncEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Library(LibraryEvent::NovelAdded { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Sync Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// The update list was fetched and item workers are about to start.
    Started {
        run_id: String,
        source_key: String,
        /// Base URL of the site being mirrored
        site: String,
        items: u64,
    },
    /// One item reached its outcome.
    ItemFinished {
        run_id: String,
        source_key: String,
        /// Outcome label, e.g. `added` or `skipped`
        outcome: String,
        chapters_added: u64,
    },
    /// Every item reached an outcome.
    Completed {
        run_id: String,
        added: u64,
        updated: u64,
        unchanged: u64,
        diverged: u64,
        skipped: u64,
        failed: u64,
        chapters_added: u64,
        chapters_skipped: u64,
        duration_ms: u64,
    },
    /// The run could not start (the update list was unavailable).
    Failed { run_id: String, message: String },
    /// The run was stopped before every item started.
    Cancelled {
        run_id: String,
        items_processed: u64,
    },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started { .. } => "Sync run started",
            SyncEvent::ItemFinished { .. } => "Item synchronized",
            SyncEvent::Completed { .. } => "Sync run completed",
            SyncEvent::Failed { .. } => "Sync run failed",
            SyncEvent::Cancelled { .. } => "Sync run cancelled",
        }
    }
}

// ============================================================================
// Library Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// A novel seen for the first time was stored.
    NovelAdded {
        novel_id: String,
        name: String,
        author: String,
        chapters: u64,
    },
    /// New chapters were appended to a tracked novel.
    ChaptersAppended {
        novel_id: String,
        name: String,
        count: u64,
        latest_chapter: Option<String>,
    },
    /// A chapter could not be fetched and was left out of the index.
    ChapterSkipped {
        source_key: String,
        novel_name: String,
        chapter_name: String,
        reason: String,
    },
    /// The stored and observed chapter lists share no anchor; nothing was written.
    IndexDiverged { novel_id: String, name: String },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::NovelAdded { .. } => "Novel added",
            LibraryEvent::ChaptersAppended { .. } => "Chapters appended",
            LibraryEvent::ChapterSkipped { .. } => "Chapter skipped",
            LibraryEvent::IndexDiverged { .. } => "Chapter index diverged",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast channel shared by every publisher and subscriber.
///
/// Cloning is cheap; clones publish into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// New independent receiver. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` that skips events not matching a predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventSeverity, EventStream};
///
/// let bus = EventBus::default();
/// let alerts = EventStream::new(bus.subscribe())
///     .filter(|event| event.severity() >= EventSeverity::Warning);
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` once every sender is dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Returns `None` if no matching event is currently buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(run_id: &str) -> CoreEvent {
        CoreEvent::Sync(SyncEvent::Started {
            run_id: run_id.to_string(),
            source_key: "updates".to_string(),
            site: "https://novels.example".to_string(),
            items: 3,
        })
    }

    fn skipped_chapter() -> CoreEvent {
        CoreEvent::Library(LibraryEvent::ChapterSkipped {
            source_key: "book-7".to_string(),
            novel_name: "Sword Song".to_string(),
            chapter_name: "Chapter 3".to_string(),
            reason: "HTTP 503".to_string(),
        })
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(started("r1")).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        assert_eq!(bus.emit(started("r1")).unwrap(), 2);

        assert_eq!(first.recv().await.unwrap(), started("r1"));
        assert_eq!(second.recv().await.unwrap(), started("r1"));
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Library(_)));

        bus.emit(started("r1")).unwrap();
        bus.emit(skipped_chapter()).unwrap();

        assert_eq!(stream.recv().await.unwrap(), skipped_chapter());
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();

        for i in 0..5 {
            bus.emit(started(&format!("r{}", i))).unwrap();
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(3))));
        assert_eq!(rx.recv().await.unwrap(), started("r3"));
    }

    #[test]
    fn test_event_severity() {
        assert_eq!(skipped_chapter().severity(), EventSeverity::Warning);
        assert_eq!(
            CoreEvent::Library(LibraryEvent::IndexDiverged {
                novel_id: "n1".to_string(),
                name: "Sword Song".to_string(),
            })
            .severity(),
            EventSeverity::Error
        );
        assert_eq!(
            CoreEvent::Sync(SyncEvent::ItemFinished {
                run_id: "r1".to_string(),
                source_key: "k".to_string(),
                outcome: "failed".to_string(),
                chapters_added: 0,
            })
            .severity(),
            EventSeverity::Warning
        );
        assert_eq!(started("r1").severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(skipped_chapter()).unwrap();
        assert_eq!(json["type"], "Library");
        assert_eq!(json["payload"]["event"], "ChapterSkipped");
        assert_eq!(json["payload"]["chapter_name"], "Chapter 3");

        let back: CoreEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, skipped_chapter());
    }

    #[test]
    fn test_event_description() {
        assert_eq!(started("r1").description(), "Sync run started");
        assert_eq!(skipped_chapter().description(), "Chapter skipped");
    }
}
