//! The fetch capability consumed by extraction and image loading.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

use super::config::FetchConfig;
use crate::errors::{PageWalkError, Result};
use crate::extract::Origin;

/// Name of the header carrying the session origin.
pub const REFERER: &str = "Referer";

/// Result of a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// HTTP status code.
    pub status_code: u16,
    /// Raw response body.
    pub body: Vec<u8>,
    /// Content type from headers.
    pub content_type: Option<String>,
}

impl FetchResult {
    /// Creates a 200 response with the given body.
    #[must_use]
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status_code: 200,
            body: body.into(),
            content_type: None,
        }
    }

    /// Whether the response is HTML.
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.content_type.as_ref().is_some_and(|ct| {
            let ct = ct.to_ascii_lowercase();
            ct.contains("text/html") || ct.contains("application/xhtml")
        })
    }

    /// Whether the fetch was successful (2xx status).
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Fails with [`PageWalkError::HttpStatus`] unless the status is 2xx.
    pub fn error_for_status(self, url: &Url) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(PageWalkError::http_status(url.as_str(), self.status_code))
        }
    }

    /// Checks status and content type, then decodes the body as a page.
    ///
    /// A response without a content type is accepted.
    pub fn into_html(self, url: &Url) -> Result<String> {
        let response = self.error_for_status(url)?;
        if let Some(content_type) = response.content_type.as_deref() {
            if !response.is_html() {
                return Err(PageWalkError::NotHtml {
                    url: url.to_string(),
                    content_type: content_type.to_string(),
                });
            }
        }
        response.text(url)
    }

    /// Decodes the body as UTF-8 text.
    pub fn text(&self, url: &Url) -> Result<String> {
        std::str::from_utf8(&self.body)
            .map(str::to_owned)
            .map_err(|_| PageWalkError::Decode {
                url: url.to_string(),
            })
    }
}

/// Protocol for HTTP fetching.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches a URL and returns the response.
    ///
    /// `timeout` overrides the configured per-request timeout.
    async fn fetch(
        &self,
        url: &Url,
        headers: &HashMap<String, String>,
        timeout: Option<Duration>,
    ) -> Result<FetchResult>;

    /// Gets the configuration.
    fn config(&self) -> &FetchConfig;
}

/// Headers for a page or image request within a session.
#[must_use]
pub fn request_headers(origin: &Origin, use_referer: bool) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    if use_referer {
        headers.insert(REFERER.to_string(), origin.referer());
    }
    headers
}
