//! Hive task lifecycle engine
//!
//! Dependency resolution, a lifecycle state machine with a parent completion
//! guard, stranded and stale task detection, and a settlement waiter, over
//! pluggable task storage.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod logging;
pub mod service;
pub mod store;
pub mod types;
