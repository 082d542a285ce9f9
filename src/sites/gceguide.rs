//! GCE Guide (`papers.gceguide.com`).
//!
//! Every listing is a `<ul id="paperslist">` of anchors. Names containing a
//! dot are files; everything else is a folder.

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{Level, SiteAdapter, Subject, encode_uri};
use crate::crawl::{
    CrawlError, HtmlPageSource, Judgement, PageElement, PageSource, Resource, crawl, sort_by_name,
};
use crate::fetch::HttpClient;

/// Production host, without a trailing slash.
pub const GCE_GUIDE_HOST: &str = "https://papers.gceguide.com";

const LISTING_CONTAINER: &str = "#paperslist";
const LISTING_ITEMS: &str = "#paperslist > li > a";

/// Server-side log file that shows up in some level listings.
const IGNORED_ENTRY: &str = "error_log";

/// Adapter for GCE Guide.
#[derive(Debug, Clone)]
pub struct GceGuide {
    client: HttpClient,
    host: String,
}

impl GceGuide {
    /// Creates an adapter for the production site.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self::with_host(client, GCE_GUIDE_HOST)
    }

    /// Creates an adapter for another host, e.g. a mirror or mock server.
    #[must_use]
    pub fn with_host(client: HttpClient, host: impl Into<String>) -> Self {
        Self {
            client,
            host: host.into().trim_end_matches('/').to_string(),
        }
    }
}

/// Files have an extension; folders don't.
fn judge_listing(element: &PageElement, current_url: &str) -> Judgement {
    let Some(href) = element.attr("href") else {
        return Judgement::skip();
    };
    if href.contains('.') {
        Judgement::result(Resource::new(
            href,
            format!("{current_url}{}", encode_uri(href)),
        ))
    } else {
        Judgement::page(format!("{current_url}{}/", encode_uri(href)))
    }
}

#[async_trait]
impl SiteAdapter for GceGuide {
    fn id(&self) -> &'static str {
        "gceguide"
    }

    fn name(&self) -> &'static str {
        "GCE Guide"
    }

    fn levels(&self) -> Vec<Level> {
        vec![
            Level::new("IGCSE", "/IGCSE/"),
            Level::new("AS & A-Level", "/A Levels/"),
            Level::new("O-Level", "/O Levels/"),
        ]
    }

    #[instrument(skip(self), fields(level = %level.name))]
    async fn subjects(&self, level: &Level) -> Result<Vec<Subject>, CrawlError> {
        let url = format!("{}{}", self.host, encode_uri(&level.url));
        let source = HtmlPageSource::new(self.client.clone(), LISTING_ITEMS)?
            .require_container(LISTING_CONTAINER)?;

        let subjects: Vec<Subject> = source
            .extract(&url)
            .await?
            .into_iter()
            .filter(|element| element.text != IGNORED_ENTRY)
            .filter_map(|element| {
                let href = element.attr("href")?.to_string();
                Some(Subject {
                    level: level.clone(),
                    name: element.text,
                    url: href,
                })
            })
            .collect();

        debug!(count = subjects.len(), "subjects listed");
        Ok(subjects)
    }

    #[instrument(skip(self, on_progress), fields(subject = %subject.name))]
    async fn papers(
        &self,
        subject: &Subject,
        on_progress: &(dyn Fn(u8) + Send + Sync),
    ) -> Result<Vec<Resource>, CrawlError> {
        let start_url = format!(
            "{}{}{}/",
            self.host,
            encode_uri(&subject.level.url),
            encode_uri(&subject.url)
        );
        let source = HtmlPageSource::new(self.client.clone(), LISTING_ITEMS)?;

        let mut papers = crawl(&start_url, &source, &judge_listing, on_progress).await?;
        sort_by_name(&mut papers);
        Ok(papers)
    }
}
