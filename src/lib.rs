//! Tidings - a personal RSS feed aggregator
//!
//! Tracks feeds per user, polls each one on a fixed interval, and stores
//! deduplicated posts. Users follow feeds and browse the posts from the
//! feeds they follow.

pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod fetcher;
pub mod follows;
pub mod ingest;
pub mod scheduler;

pub use error::{Error, Result};
