//! HTTP client wrapper shared by the crawler and the download queue.
//!
//! Page fetches are bounded by a whole-request timeout because the crawler
//! never retries. Transfer requests have only a connect timeout; the queue's
//! stall timer decides when a slow body is given up on.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, PAGE_TIMEOUT_SECS};
use super::error::FetchError;
use crate::user_agent;

/// Timeout settings for [`HttpClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTimeouts {
    /// TCP/TLS connect timeout, applied to every request.
    pub connect: Duration,
    /// Whole-request timeout for [`HttpClient::get_text`].
    pub page: Duration,
}

impl Default for FetchTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            page: Duration::from_secs(PAGE_TIMEOUT_SECS),
        }
    }
}

/// HTTP client for directory pages and file transfers.
///
/// Create once and clone freely; clones share the connection pool.
///
/// # Example
///
/// ```no_run
/// use papergrab_core::fetch::HttpClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let html = client.get_text("https://papers.gceguide.com/IGCSE/").await?;
/// println!("{} bytes of listing", html.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    page_timeout: Duration,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a client with default timeouts (30s connect, 30s per page).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeouts(FetchTimeouts::default())
    }

    /// Creates a client with explicit timeouts.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_timeouts(timeouts: FetchTimeouts) -> Self {
        let client = Client::builder()
            .connect_timeout(timeouts.connect)
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            client,
            page_timeout: timeouts.page,
        }
    }

    /// Sends a GET request and returns the response once headers arrive.
    ///
    /// The body is left unread so callers can stream it.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the URL is invalid, the request fails, or
    /// the server answers with a non-success status.
    #[instrument(level = "debug", skip(self))]
    pub async fn get(&self, url: &str) -> Result<Response, FetchError> {
        let request = self.request(url)?;
        send_checked(request, url).await
    }

    /// Fetches a page and returns its decoded body text.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on invalid URL, network failure, timeout, or
    /// non-success status.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let request = self.request(url)?.timeout(self.page_timeout);
        let response = send_checked(request, url).await?;
        let text = response
            .text()
            .await
            .map_err(|e| FetchError::network(url, e))?;
        debug!(bytes = text.len(), "page received");
        Ok(text)
    }

    fn request(&self, url: &str) -> Result<RequestBuilder, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;
        Ok(self.client.get(parsed))
    }
}

async fn send_checked(request: RequestBuilder, url: &str) -> Result<Response, FetchError> {
    let response = request
        .send()
        .await
        .map_err(|e| FetchError::network(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::http_status(url, status.as_u16()));
    }
    Ok(response)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    #[tokio::test]
    async fn test_get_text_returns_body() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(path("/IGCSE/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<ul id=\"paperslist\"></ul>"))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let text = client
            .get_text(&format!("{}/IGCSE/", mock_server.uri()))
            .await
            .unwrap();
        assert!(text.contains("paperslist"));
    }

    #[tokio::test]
    async fn test_get_text_404_is_http_status_error() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(path("/missing/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let result = client
            .get_text(&format!("{}/missing/", mock_server.uri()))
            .await;
        match result {
            Err(FetchError::HttpStatus { status, .. }) => assert_eq!(status, 404),
            other => panic!("Expected HttpStatus error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_text_page_timeout() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(path("/slow/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let client = HttpClient::with_timeouts(FetchTimeouts {
            connect: Duration::from_secs(5),
            page: Duration::from_millis(200),
        });
        let result = client.get_text(&format!("{}/slow/", mock_server.uri())).await;
        assert!(
            matches!(result, Err(FetchError::Timeout { .. })),
            "Expected Timeout, got: {result:?}"
        );
    }

    #[tokio::test]
    async fn test_get_invalid_url() {
        let client = HttpClient::new();
        let result = client.get("not-a-valid-url").await;
        assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
    }
}
