//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the novel mirror:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! Every other crate in the workspace logs through `tracing` as configured
//! here, receives its collaborators through [`config::MirrorConfig`] and
//! reports progress on an [`events::EventBus`].

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{MirrorConfig, MirrorConfigBuilder, SyncSettings};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, LibraryEvent, SyncEvent};
