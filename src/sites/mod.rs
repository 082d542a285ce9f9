//! Site adapters for exam-paper archives.
//!
//! Each adapter knows one archive's URL layout and listing markup and turns
//! levels and subjects into crawls. The crawler itself never sees a
//! selector table; adapters pass it an [`HtmlPageSource`](crate::crawl::HtmlPageSource)
//! and a judge.

mod gceguide;
mod papacambridge;

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::crawl::{CrawlError, Resource};
use crate::fetch::HttpClient;

pub use gceguide::{GCE_GUIDE_HOST, GceGuide};
pub use papacambridge::{PAPA_CAMBRIDGE_HOST, PapaCambridge};

/// Subject codes are four-digit syllabus numbers, e.g. `0625`.
#[allow(clippy::expect_used)]
static SUBJECT_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]{4}").expect("subject code regex is valid") // Static pattern, safe to panic
});

/// An examination level offered by a site, e.g. IGCSE.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Level {
    /// Display name.
    pub name: String,
    /// Site-relative path or query of the level listing.
    pub url: String,
}

impl Level {
    /// Creates a level.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// A subject listed under a level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    /// Level the subject was listed under.
    pub level: Level,
    /// Display name, e.g. `Physics (0625)`.
    pub name: String,
    /// Site-specific link to the subject listing.
    pub url: String,
}

impl Subject {
    /// Returns the syllabus code: the last four-digit run in the name.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        SUBJECT_CODE
            .find_iter(&self.name)
            .last()
            .map(|m| m.as_str())
    }

    /// True when `query` is this subject's name (case-insensitive) or code.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        self.name.eq_ignore_ascii_case(query) || self.code() == Some(query)
    }
}

/// An archive that can list levels, subjects and papers.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    /// Stable identifier used on the command line.
    fn id(&self) -> &'static str;

    /// Human-readable site name.
    fn name(&self) -> &'static str;

    /// Levels the site offers. Static, no network access.
    fn levels(&self) -> Vec<Level>;

    /// Finds a level by name, ignoring ASCII case.
    fn level(&self, name: &str) -> Option<Level> {
        self.levels()
            .into_iter()
            .find(|level| level.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Lists the subjects under `level`.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError`] if the level page cannot be fetched or is not a
    /// listing.
    async fn subjects(&self, level: &Level) -> Result<Vec<Subject>, CrawlError>;

    /// Crawls every paper of `subject`, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError`] if any page of the crawl fails.
    async fn papers(
        &self,
        subject: &Subject,
        on_progress: &(dyn Fn(u8) + Send + Sync),
    ) -> Result<Vec<Resource>, CrawlError>;
}

/// Every supported site, in display order.
#[must_use]
pub fn all_sites(client: &HttpClient) -> Vec<Box<dyn SiteAdapter>> {
    vec![
        Box::new(GceGuide::new(client.clone())),
        Box::new(PapaCambridge::new(client.clone())),
    ]
}

/// Looks up a site by its [`SiteAdapter::id`].
#[must_use]
pub fn site_by_id(id: &str, client: &HttpClient) -> Option<Box<dyn SiteAdapter>> {
    all_sites(client)
        .into_iter()
        .find(|site| site.id().eq_ignore_ascii_case(id.trim()))
}

/// Percent-encodes `input` the way browsers' `encodeURI` does: URI
/// delimiters and unreserved marks are kept, everything else (including
/// `%`) is escaped as UTF-8 bytes.
#[must_use]
pub fn encode_uri(input: &str) -> String {
    const KEEP: &[u8] = b";,/?:@&=+$-_.!~*'()#";

    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        if byte.is_ascii_alphanumeric() || KEEP.contains(&byte) {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}
