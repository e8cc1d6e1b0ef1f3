//! An in-memory fetcher serving canned responses.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

use crate::errors::{PageWalkError, Result};
use crate::fetch::{FetchConfig, FetchResult, Fetcher};

#[derive(Debug, Clone)]
enum Script {
    Respond {
        status: u16,
        body: Vec<u8>,
        content_type: Option<String>,
    },
    Fail(String),
}

/// A request seen by [`ScriptedFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Requested URL.
    pub url: String,
    /// Headers passed by the caller.
    pub headers: HashMap<String, String>,
    /// Timeout passed by the caller.
    pub timeout: Option<Duration>,
}

/// Serves scripted responses per URL and records every request.
///
/// Unknown URLs answer 404.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    config: FetchConfig,
    scripts: Mutex<HashMap<String, Script>>,
    delays: Mutex<HashMap<String, Duration>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedFetcher {
    /// Creates a fetcher with no scripted URLs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the fetch configuration.
    #[must_use]
    pub fn with_config(mut self, config: FetchConfig) -> Self {
        self.config = config;
        self
    }

    /// Serves `html` with status 200 for `url`.
    #[must_use]
    pub fn with_page(self, url: &str, html: impl Into<String>) -> Self {
        self.set_page(url, html);
        self
    }

    /// Serves `body` with `status` for `url`.
    #[must_use]
    pub fn with_status(self, url: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.scripts.lock().insert(
            url.to_string(),
            Script::Respond {
                status,
                body: body.into(),
                content_type: None,
            },
        );
        self
    }

    /// Serves raw bytes for `url`, e.g. an encoded image.
    #[must_use]
    pub fn with_bytes(self, url: &str, body: impl Into<Vec<u8>>, content_type: &str) -> Self {
        self.scripts.lock().insert(
            url.to_string(),
            Script::Respond {
                status: 200,
                body: body.into(),
                content_type: Some(content_type.to_string()),
            },
        );
        self
    }

    /// Fails requests to `url` with a transport error.
    #[must_use]
    pub fn with_failure(self, url: &str, reason: impl Into<String>) -> Self {
        self.scripts
            .lock()
            .insert(url.to_string(), Script::Fail(reason.into()));
        self
    }

    /// Delays responses for `url`.
    #[must_use]
    pub fn with_delay(self, url: &str, delay: Duration) -> Self {
        self.delays.lock().insert(url.to_string(), delay);
        self
    }

    /// Serves `html` for `url`, replacing any previous script.
    pub fn set_page(&self, url: &str, html: impl Into<String>) {
        self.scripts.lock().insert(
            url.to_string(),
            Script::Respond {
                status: 200,
                body: html.into().into_bytes(),
                content_type: Some("text/html; charset=utf-8".to_string()),
            },
        );
    }

    /// All requests in the order they were made.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// URLs requested, in order.
    #[must_use]
    pub fn requested_urls(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.url.clone()).collect()
    }

    /// Number of requests made.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Forgets recorded requests.
    pub fn reset(&self) {
        self.requests.lock().clear();
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        url: &Url,
        headers: &HashMap<String, String>,
        timeout: Option<Duration>,
    ) -> Result<FetchResult> {
        self.requests.lock().push(RecordedRequest {
            url: url.to_string(),
            headers: headers.clone(),
            timeout,
        });

        let delay = self.delays.lock().get(url.as_str()).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let script = self.scripts.lock().get(url.as_str()).cloned();
        match script {
            Some(Script::Respond {
                status,
                body,
                content_type,
            }) => Ok(FetchResult {
                status_code: status,
                body,
                content_type,
            }),
            Some(Script::Fail(reason)) => Err(PageWalkError::fetch(url.as_str(), reason)),
            None => Ok(FetchResult {
                status_code: 404,
                ..FetchResult::ok(Vec::new())
            }),
        }
    }

    fn config(&self) -> &FetchConfig {
        &self.config
    }
}
