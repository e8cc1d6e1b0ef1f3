//! Error types for pagewalk.
//!
//! Malformed tags and unparseable attribute values never surface here; the
//! scanner skips them. What remains are the failures a caller has to act on:
//! bad seed URLs, network problems, pages without images and cancellation.

use std::collections::HashMap;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PageWalkError>;

/// The main error type for pagewalk operations.
#[derive(Debug, Error)]
pub enum PageWalkError {
    /// A URL could not be parsed or is not usable as a page address.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending input.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The transport failed before a response was received.
    #[error("Fetch failed for {url}: {reason}")]
    Fetch {
        /// The requested URL.
        url: String,
        /// Transport error description.
        reason: String,
    },

    /// The request exceeded its timeout.
    #[error("Fetch timed out for {url} after {timeout_seconds}s")]
    Timeout {
        /// The requested URL.
        url: String,
        /// The timeout that elapsed.
        timeout_seconds: f64,
    },

    /// The server answered with a non-success status.
    #[error("Failed status code: {status} for {url}")]
    HttpStatus {
        /// The requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The response body is not valid UTF-8 text.
    #[error("Response from {url} is not decodable text")]
    Decode {
        /// The requested URL.
        url: String,
    },

    /// A page response declared a content type other than HTML.
    #[error("Expected HTML from {url}, got {content_type}")]
    NotHtml {
        /// The page URL.
        url: String,
        /// The declared content type.
        content_type: String,
    },

    /// The page was fetched but no image links were found in it.
    #[error("No images found on {url}")]
    NoImages {
        /// The page URL.
        url: String,
    },

    /// The operation was cancelled.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Image bytes could not be decoded.
    #[error("Image error for {url}: {reason}")]
    Image {
        /// The image URL.
        url: String,
        /// Decoder error description.
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PageWalkError {
    /// Creates an invalid URL error.
    #[must_use]
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a transport failure error.
    #[must_use]
    pub fn fetch(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(url: impl Into<String>, timeout_seconds: f64) -> Self {
        Self::Timeout {
            url: url.into(),
            timeout_seconds,
        }
    }

    /// Creates a status error.
    #[must_use]
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a no-images error.
    #[must_use]
    pub fn no_images(url: impl Into<String>) -> Self {
        Self::NoImages { url: url.into() }
    }

    /// Whether retrying the same request might succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch { .. } | Self::Timeout { .. } => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Whether this error is a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Stable type name for the error, used in dictionaries and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUrl { .. } => "InvalidUrl",
            Self::Fetch { .. } => "FetchError",
            Self::Timeout { .. } => "Timeout",
            Self::HttpStatus { .. } => "HttpStatus",
            Self::Decode { .. } => "DecodeError",
            Self::NotHtml { .. } => "NotHtml",
            Self::NoImages { .. } => "NoImages",
            Self::Cancelled(_) => "Cancelled",
            Self::Image { .. } => "ImageError",
            Self::Serialization(_) => "SerializationError",
            Self::Io(_) => "IoError",
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!(self.kind()));

        match self {
            Self::InvalidUrl { url, .. }
            | Self::Fetch { url, .. }
            | Self::Timeout { url, .. }
            | Self::Decode { url }
            | Self::NoImages { url }
            | Self::Image { url, .. } => {
                map.insert("url".to_string(), serde_json::json!(url));
            }
            Self::HttpStatus { url, status } => {
                map.insert("url".to_string(), serde_json::json!(url));
                map.insert("status".to_string(), serde_json::json!(status));
            }
            Self::NotHtml { url, content_type } => {
                map.insert("url".to_string(), serde_json::json!(url));
                map.insert("content_type".to_string(), serde_json::json!(content_type));
            }
            Self::Cancelled(reason) => {
                map.insert("reason".to_string(), serde_json::json!(reason));
            }
            Self::Serialization(_) | Self::Io(_) => {}
        }

        map.insert("recoverable".to_string(), serde_json::json!(self.is_recoverable()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}
