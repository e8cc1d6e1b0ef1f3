//! Extraction results and their transport form.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use super::origin::Origin;
use crate::errors::Result;

/// Image links and pagination links found on one page (or accumulated over a run).
///
/// A result always holds at least one image URL; producing operations
/// return `None` instead of an empty result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    image_urls: Vec<Url>,
    next_page_link: Option<Url>,
    last_page_link: Option<Url>,
}

impl ExtractionResult {
    /// Creates a result, or `None` when `image_urls` is empty.
    #[must_use]
    pub fn new(
        image_urls: Vec<Url>,
        next_page_link: Option<Url>,
        last_page_link: Option<Url>,
    ) -> Option<Self> {
        if image_urls.is_empty() {
            return None;
        }
        Some(Self {
            image_urls,
            next_page_link,
            last_page_link,
        })
    }

    /// Image URLs in document order.
    #[must_use]
    pub fn image_urls(&self) -> &[Url] {
        &self.image_urls
    }

    /// Number of image URLs.
    #[must_use]
    pub fn image_count(&self) -> usize {
        self.image_urls.len()
    }

    /// Link whose text equals the "next page" label.
    #[must_use]
    pub fn next_page_link(&self) -> Option<&Url> {
        self.next_page_link.as_ref()
    }

    /// Link whose text equals the "previous page" label.
    #[must_use]
    pub fn last_page_link(&self) -> Option<&Url> {
        self.last_page_link.as_ref()
    }

    /// Splits the result into its parts.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Url>, Option<Url>, Option<Url>) {
        (self.image_urls, self.next_page_link, self.last_page_link)
    }

    /// Converts to the transport payload.
    #[must_use]
    pub fn to_payload(&self) -> ExtractionPayload {
        ExtractionPayload {
            image_urls: self.image_urls.iter().map(|u| u.to_string()).collect(),
            next_page_url: self.next_page_link.as_ref().map(ToString::to_string),
            last_page_url: self.last_page_link.as_ref().map(ToString::to_string),
        }
    }

    /// Builds a result from a payload, resolving every URL against `origin`.
    ///
    /// Entries that fail to resolve are dropped. Returns `None` when no image
    /// URL survives.
    #[must_use]
    pub fn from_payload(payload: &ExtractionPayload, origin: &Origin) -> Option<Self> {
        let images = payload
            .image_urls
            .iter()
            .filter_map(|raw| origin.process_url(raw))
            .collect();
        let next = payload
            .next_page_url
            .as_deref()
            .and_then(|raw| origin.process_url(raw));
        let last = payload
            .last_page_url
            .as_deref()
            .and_then(|raw| origin.process_url(raw));
        Self::new(images, next, last)
    }

    /// Serializes the transport payload to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_payload())?)
    }

    /// Parses a JSON payload produced by an external extractor.
    ///
    /// Returns `None` for invalid JSON or when `image_urls` is missing or not
    /// a list of strings. A non-string `next_page_url` or `last_page_url` is
    /// ignored.
    #[must_use]
    pub fn from_json(json: &str, origin: &Origin) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(json).ok()?;
        let payload = ExtractionPayload::from_value(&value)?;
        Self::from_payload(&payload, origin)
    }
}

impl fmt::Display for ExtractionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExtractionResult - images: {} next: {} last: {}",
            self.image_urls.len(),
            self.next_page_link.as_ref().map_or("", Url::as_str),
            self.last_page_link.as_ref().map_or("", Url::as_str),
        )
    }
}

/// Structured transport form of an [`ExtractionResult`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionPayload {
    /// Image URLs.
    pub image_urls: Vec<String>,
    /// Next page URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_url: Option<String>,
    /// Previous page URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_page_url: Option<String>,
}

impl ExtractionPayload {
    /// Reads a payload out of a JSON value.
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        let image_urls = value
            .get("image_urls")?
            .as_array()?
            .iter()
            .map(|v| v.as_str().map(String::from))
            .collect::<Option<Vec<_>>>()?;

        Some(Self {
            image_urls,
            next_page_url: value
                .get("next_page_url")
                .and_then(|v| v.as_str())
                .map(String::from),
            last_page_url: value
                .get("last_page_url")
                .and_then(|v| v.as_str())
                .map(String::from),
        })
    }
}
