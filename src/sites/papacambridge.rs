//! Papa Cambridge (`pastpapers.papacambridge.com`).
//!
//! Listings are tables whose cells carry `data-href` and `data-name`.
//! Folder links are `?dir=` queries relative to the host.

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{Level, SiteAdapter, Subject};
use crate::crawl::{
    CrawlError, HtmlPageSource, Judgement, PageElement, PageSource, Resource, crawl, sort_by_name,
};
use crate::fetch::HttpClient;

/// Production host, with the trailing slash every link is appended to.
pub const PAPA_CAMBRIDGE_HOST: &str = "https://pastpapers.papacambridge.com/";

const LISTING_CONTAINER: &str = "#data";
const SUBJECT_ITEMS: &str =
    "#data > div > div > div.col-lg-8.blog_sidebar_left > div > table > tbody > tr > td > a";
const PAPER_ITEMS: &str =
    "#data > div > div > div.col-lg-8.blog_sidebar_left > div > table > tbody > tr > td";

const FOLDER_PREFIX: &str = "?dir=";
const PARENT_ENTRY: &str = "..";

/// Adapter for Papa Cambridge.
#[derive(Debug, Clone)]
pub struct PapaCambridge {
    client: HttpClient,
    host: String,
}

impl PapaCambridge {
    /// Creates an adapter for the production site.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self::with_host(client, PAPA_CAMBRIDGE_HOST)
    }

    /// Creates an adapter for another host; a trailing slash is added if
    /// missing.
    #[must_use]
    pub fn with_host(client: HttpClient, host: impl Into<String>) -> Self {
        let mut host = host.into();
        if !host.ends_with('/') {
            host.push('/');
        }
        Self { client, host }
    }
}

fn judge_cell(host: &str, element: &PageElement) -> Judgement {
    let Some(href) = element.attr("data-href") else {
        return Judgement::skip();
    };
    if href.starts_with(FOLDER_PREFIX) {
        return Judgement::page(format!("{host}{href}"));
    }
    match element.attr("data-name") {
        Some(name) if name != PARENT_ENTRY => {
            Judgement::result(Resource::new(name, format!("{host}{href}")))
        }
        _ => Judgement::skip(),
    }
}

#[async_trait]
impl SiteAdapter for PapaCambridge {
    fn id(&self) -> &'static str {
        "papacambridge"
    }

    fn name(&self) -> &'static str {
        "Papa Cambridge"
    }

    fn levels(&self) -> Vec<Level> {
        vec![
            Level::new(
                "IGCSE",
                "?dir=Cambridge%20International%20Examinations%20%28CIE%29/IGCSE/",
            ),
            Level::new(
                "AS & A-Level",
                "?dir=Cambridge%20International%20Examinations%20%28CIE%29/AS%20and%20A%20Level/",
            ),
            Level::new(
                "O-Level",
                "?dir=Cambridge%20International%20Examinations%20%28CIE%29/GCE%20International%20O%20Level/",
            ),
        ]
    }

    #[instrument(skip(self), fields(level = %level.name))]
    async fn subjects(&self, level: &Level) -> Result<Vec<Subject>, CrawlError> {
        let url = format!("{}{}", self.host, level.url);
        let source = HtmlPageSource::new(self.client.clone(), SUBJECT_ITEMS)?
            .require_container(LISTING_CONTAINER)?;

        let subjects: Vec<Subject> = source
            .extract(&url)
            .await?
            .into_iter()
            .filter_map(|element| {
                let name = element.attr("data-name")?;
                if name == PARENT_ENTRY {
                    return None;
                }
                Some(Subject {
                    level: level.clone(),
                    name: name.to_string(),
                    url: element.attr("href")?.to_string(),
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
        let start_url = format!("{}{}", self.host, subject.url);
        let source = HtmlPageSource::new(self.client.clone(), PAPER_ITEMS)?;
        let host = self.host.as_str();
        let judge = |element: &PageElement, _current: &str| judge_cell(host, element);

        let mut papers = crawl(&start_url, &source, &judge, on_progress).await?;
        sort_by_name(&mut papers);
        Ok(papers)
    }
}
