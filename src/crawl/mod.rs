//! Recursive crawler for directory-style archive listings.
//!
//! A crawl starts at one page, asks a [`PageSource`] for its candidate
//! elements, and lets a [`Judge`] classify each one as a sub-page to descend
//! into, a [`Resource`] to emit, or noise. Sub-pages are crawled concurrently
//! with no depth or width limit; a per-crawl visited set keeps cyclic
//! listings finite.
//!
//! # Semantics
//!
//! - Output order follows element enumeration order on each page, not the
//!   order in which branches finish.
//! - Only the outermost page reports progress, as the rounded share of its
//!   immediate children that have finished.
//! - Any error on any page fails the whole crawl. Sibling branches are
//!   joined fail-fast: the first error drops (and so cancels) the rest.
//!
//! # Example
//!
//! ```no_run
//! use papergrab_core::crawl::{crawl, HtmlPageSource, Judgement, PageElement, Resource};
//! use papergrab_core::fetch::HttpClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = HtmlPageSource::new(HttpClient::new(), "#paperslist > li > a")?;
//! let judge = |element: &PageElement, current: &str| match element.attr("href") {
//!     Some(href) if href.contains('.') => {
//!         Judgement::result(Resource::new(href, format!("{current}{href}")))
//!     }
//!     Some(href) => Judgement::page(format!("{current}{href}/")),
//!     None => Judgement::skip(),
//! };
//! let papers = crawl("https://papers.gceguide.com/IGCSE/Physics%20(0625)/", &source, &judge, |p| {
//!     println!("{p}%");
//! })
//! .await?;
//! println!("{} papers", papers.len());
//! # Ok(())
//! # }
//! ```

mod error;
mod html;
mod judgement;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use futures_util::future::{BoxFuture, try_join_all};
use tracing::{debug, info, instrument};

pub use error::CrawlError;
pub use html::{HtmlPageSource, PageElement, compile_selector, parse_elements};
pub use judgement::{Directive, Judge, Judgement, Resource, sort_by_name};

/// Fetches a page and extracts its candidate elements.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Returns the elements of the page at `url`, in document order.
    ///
    /// # Errors
    ///
    /// Any error aborts the crawl that requested the page.
    async fn extract(&self, url: &str) -> Result<Vec<PageElement>, CrawlError>;
}

type Progress<'a> = &'a (dyn Fn(u8) + Send + Sync);

/// Crawls from `start_url` and returns every resource the judge emits.
///
/// `on_progress` receives values in `0..=100` for the start page only.
///
/// # Errors
///
/// Returns the first [`CrawlError`] raised by any page; no partial result
/// is produced.
#[instrument(skip(source, judge, on_progress))]
pub async fn crawl<S, J, P>(
    start_url: &str,
    source: &S,
    judge: &J,
    on_progress: P,
) -> Result<Vec<Resource>, CrawlError>
where
    S: PageSource + ?Sized,
    J: Judge + ?Sized,
    P: Fn(u8) + Send + Sync,
{
    let walk = Walk {
        source,
        judge,
        visited: Mutex::new(HashSet::new()),
    };
    let resources = walk.visit(start_url.to_string(), Some(&on_progress)).await?;
    info!(
        resources = resources.len(),
        pages = walk.visited_count(),
        "crawl complete"
    );
    Ok(resources)
}

/// State of one top-level crawl.
struct Walk<'a, S: ?Sized, J: ?Sized> {
    source: &'a S,
    judge: &'a J,
    visited: Mutex<HashSet<String>>,
}

impl<S, J> Walk<'_, S, J>
where
    S: PageSource + ?Sized,
    J: Judge + ?Sized,
{
    /// Records `url` as visited; false if it already was.
    fn mark_visited(&self, url: &str) -> bool {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string())
    }

    fn visited_count(&self) -> usize {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn visit<'s>(
        &'s self,
        url: String,
        progress: Option<Progress<'s>>,
    ) -> BoxFuture<'s, Result<Vec<Resource>, CrawlError>> {
        Box::pin(async move {
            if !self.mark_visited(&url) {
                debug!(url = %url, "page already visited");
                return Ok(Vec::new());
            }
            if let Some(report) = progress {
                report(0);
            }

            let elements = self.source.extract(&url).await?;
            let total = elements.len();
            debug!(url = %url, elements = total, "visiting page");

            if total == 0 {
                if let Some(report) = progress {
                    report(100);
                }
                return Ok(Vec::new());
            }

            let completed = AtomicUsize::new(0);
            let branches = elements.iter().map(|element| {
                let directive = self.judge.judge(element, &url).into_directive();
                let completed = &completed;
                async move {
                    let found = match directive {
                        Directive::Descend(page) => self.visit(page, None).await?,
                        Directive::Emit(resource) => vec![resource],
                        Directive::Skip => Vec::new(),
                    };
                    if let Some(report) = progress {
                        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                        report(percent(done, total));
                    }
                    Ok::<_, CrawlError>(found)
                }
            });

            let results = try_join_all(branches).await?;
            Ok(results.into_iter().flatten().collect())
        })
    }
}

/// `round(100 * done / total)` without floating point.
fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let rounded = (done * 200 + total) / (2 * total);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}
