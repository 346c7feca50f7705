//! Workspace umbrella crate.
//!
//! Re-exports the service façade so a host binary can depend on
//! `novel-mirror-workspace` alone and reach the engine, configuration and
//! logging entry points without wiring each workspace crate individually.

#[cfg(feature = "service")]
pub use core_service::*;
