//! Papergrab Core Library
//!
//! Acquisition engine for exam-paper archives: a recursive crawler that
//! turns directory-style listings into a flat list of downloadable files,
//! and a download queue that fetches them under a concurrency ceiling with
//! stall recovery and atomic file materialization.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`fetch`] - HTTP client shared by crawler and queue
//! - [`crawl`] - Recursive, cycle-safe listing crawler
//! - [`queue`] - Download queue with waiting-task admission
//! - [`sites`] - Adapters for the supported archives

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod crawl;
pub mod fetch;
pub mod queue;
pub mod sites;
mod user_agent;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use crawl::{CrawlError, Judgement, PageElement, PageSource, Resource, crawl};
pub use fetch::{FetchError, FetchTimeouts, HttpClient};
pub use queue::{DownloadQueue, QueueConfig, QueueError, Task, TaskEvent, TaskStatus};
pub use sites::{Level, SiteAdapter, Subject, all_sites, site_by_id};
