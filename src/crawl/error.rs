//! Error types for crawl operations.

use thiserror::Error;

use crate::fetch::FetchError;

/// Errors that abort a crawl.
///
/// A crawl is all-or-nothing: any of these raised while visiting any page
/// fails the whole call and no partial resource list is produced.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// A page could not be fetched.
    #[error("crawl fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// A page was fetched but did not have the expected listing structure.
    #[error("unexpected page structure at {url}: {reason}")]
    Structure {
        /// The page that did not match.
        url: String,
        /// What was missing or malformed.
        reason: String,
    },

    /// A CSS selector could not be compiled.
    #[error("invalid selector `{selector}`: {reason}")]
    Selector {
        /// The selector source text.
        selector: String,
        /// Parser message.
        reason: String,
    },
}

impl CrawlError {
    /// Creates a structural mismatch error.
    pub fn structure(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Structure {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a selector compilation error.
    pub fn selector(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Selector {
            selector: selector.into(),
            reason: reason.into(),
        }
    }
}
