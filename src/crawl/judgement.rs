//! Judge decisions and the resource descriptors they produce.

use serde::{Deserialize, Serialize};

use super::html::PageElement;

/// A downloadable file discovered by a crawl.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Resource {
    /// Display name, usually the file name as listed.
    pub name: String,
    /// Absolute URL of the file.
    pub url: String,
}

impl Resource {
    /// Creates a resource descriptor.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Sorts resources by name, ascending, the order adapters hand out.
pub fn sort_by_name(resources: &mut [Resource]) {
    resources.sort_by(|a, b| a.name.cmp(&b.name));
}

/// The outcome of judging one page element.
///
/// A judgement may carry both a page and a result; the page wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Judgement {
    /// Sub-page to descend into.
    pub page: Option<String>,
    /// Resource to emit.
    pub result: Option<Resource>,
}

impl Judgement {
    /// Descend into `url`.
    pub fn page(url: impl Into<String>) -> Self {
        Self {
            page: Some(url.into()),
            result: None,
        }
    }

    /// Emit `resource`.
    #[must_use]
    pub fn result(resource: Resource) -> Self {
        Self {
            page: None,
            result: Some(resource),
        }
    }

    /// Ignore the element.
    #[must_use]
    pub fn skip() -> Self {
        Self::default()
    }

    /// Resolves the judgement into a single action.
    #[must_use]
    pub fn into_directive(self) -> Directive {
        match (self.page, self.result) {
            (Some(page), _) => Directive::Descend(page),
            (None, Some(resource)) => Directive::Emit(resource),
            (None, None) => Directive::Skip,
        }
    }
}

/// What the crawler does with one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Crawl this page and splice in its resources.
    Descend(String),
    /// Add this resource to the output.
    Emit(Resource),
    /// Nothing.
    Skip,
}

/// Site-specific classification of page elements.
///
/// Implemented for any `Fn(&PageElement, &str) -> Judgement` closure, where
/// the second argument is the URL of the page the element was found on.
pub trait Judge: Send + Sync {
    /// Classifies `element`, found on `current_url`.
    fn judge(&self, element: &PageElement, current_url: &str) -> Judgement;
}

impl<F> Judge for F
where
    F: Fn(&PageElement, &str) -> Judgement + Send + Sync,
{
    fn judge(&self, element: &PageElement, current_url: &str) -> Judgement {
        self(element, current_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_wins_over_result() {
        let judgement = Judgement {
            page: Some("https://a.example/sub/".to_string()),
            result: Some(Resource::new("x.pdf", "https://a.example/x.pdf")),
        };
        assert_eq!(
            judgement.into_directive(),
            Directive::Descend("https://a.example/sub/".to_string())
        );
    }

    #[test]
    fn test_result_only_emits() {
        let resource = Resource::new("x.pdf", "https://a.example/x.pdf");
        assert_eq!(
            Judgement::result(resource.clone()).into_directive(),
            Directive::Emit(resource)
        );
    }

    #[test]
    fn test_empty_judgement_skips() {
        assert_eq!(Judgement::skip().into_directive(), Directive::Skip);
    }

    #[test]
    fn test_sort_by_name_is_lexicographic() {
        let mut resources = vec![
            Resource::new("0625_s21_qp_12.pdf", "u3"),
            Resource::new("0625_m21_qp_12.pdf", "u1"),
            Resource::new("0625_s21_ms_12.pdf", "u2"),
        ];
        sort_by_name(&mut resources);
        let names: Vec<_> = resources.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            ["0625_m21_qp_12.pdf", "0625_s21_ms_12.pdf", "0625_s21_qp_12.pdf"]
        );
    }

    #[test]
    fn test_closure_is_a_judge() {
        let judge = |element: &PageElement, current: &str| match element.attr("href") {
            Some(href) => Judgement::page(format!("{current}{href}")),
            None => Judgement::skip(),
        };
        let element = PageElement::new("a").with_attr("href", "sub/");
        assert_eq!(
            judge.judge(&element, "https://a.example/").page.as_deref(),
            Some("https://a.example/sub/")
        );
    }
}
