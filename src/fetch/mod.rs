//! HTTP fetcher shared by the crawler and the download queue.
//!
//! A thin layer over `reqwest`: one client with a project User-Agent, status
//! checking, and URL-carrying errors. Pages come back as text; transfers get
//! the raw [`reqwest::Response`] so the queue can stream the body itself.

mod client;
mod constants;
mod error;

pub use client::{FetchTimeouts, HttpClient};
pub use constants::{CONNECT_TIMEOUT_SECS, PAGE_TIMEOUT_SECS};
pub use error::FetchError;
