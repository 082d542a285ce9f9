//! HTML directory-listing extraction.
//!
//! `scraper::Html` is not `Send`, so documents are parsed and dropped inside
//! a synchronous function and only owned [`PageElement`] snapshots cross
//! await points.

use std::collections::BTreeMap;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, instrument};

use super::{CrawlError, PageSource};
use crate::fetch::HttpClient;

/// Owned snapshot of one matched HTML element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageElement {
    /// Lower-case tag name.
    pub tag: String,
    /// Attributes as written in the document.
    pub attributes: BTreeMap<String, String>,
    /// Concatenated, trimmed text content.
    pub text: String,
}

impl PageElement {
    /// Creates an element with no attributes or text.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Sets the text content.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Returns an attribute value.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Compiles a CSS selector, mapping failures into [`CrawlError::Selector`].
///
/// # Errors
///
/// Returns [`CrawlError::Selector`] when `source` is not a valid selector.
pub fn compile_selector(source: &str) -> Result<Selector, CrawlError> {
    Selector::parse(source).map_err(|e| CrawlError::selector(source, e.to_string()))
}

/// Parses `html` and snapshots every element matching `items`.
///
/// Returns `None` when `container` is given and nothing in the document
/// matches it.
#[must_use]
pub fn parse_elements(
    html: &str,
    items: &Selector,
    container: Option<&Selector>,
) -> Option<Vec<PageElement>> {
    let document = Html::parse_document(html);

    if let Some(container) = container
        && document.select(container).next().is_none()
    {
        return None;
    }

    let elements = document
        .select(items)
        .map(|element| {
            let value = element.value();
            PageElement {
                tag: value.name().to_string(),
                attributes: value
                    .attrs()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect(),
                text: element.text().collect::<String>().trim().to_string(),
            }
        })
        .collect();
    Some(elements)
}

/// [`PageSource`] that fetches pages over HTTP and selects elements by CSS.
#[derive(Debug, Clone)]
pub struct HtmlPageSource {
    client: HttpClient,
    items: Selector,
    container: Option<(Selector, String)>,
}

impl HtmlPageSource {
    /// Creates a source selecting `item_selector` on every page.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Selector`] for an invalid selector.
    pub fn new(client: HttpClient, item_selector: &str) -> Result<Self, CrawlError> {
        Ok(Self {
            client,
            items: compile_selector(item_selector)?,
            container: None,
        })
    }

    /// Requires every page to contain `selector`; pages without it fail the
    /// crawl with [`CrawlError::Structure`].
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Selector`] for an invalid selector.
    pub fn require_container(mut self, selector: &str) -> Result<Self, CrawlError> {
        self.container = Some((compile_selector(selector)?, selector.to_string()));
        Ok(self)
    }
}

#[async_trait]
impl PageSource for HtmlPageSource {
    #[instrument(level = "debug", skip(self))]
    async fn extract(&self, url: &str) -> Result<Vec<PageElement>, CrawlError> {
        let body = self.client.get_text(url).await?;
        let container = self.container.as_ref().map(|(selector, _)| selector);

        let Some(elements) = parse_elements(&body, &self.items, container) else {
            let expected = self
                .container
                .as_ref()
                .map_or("", |(_, source)| source.as_str());
            return Err(CrawlError::structure(
                url,
                format!("no element matches `{expected}`"),
            ));
        };

        debug!(count = elements.len(), "extracted page elements");
        Ok(elements)
    }
}
