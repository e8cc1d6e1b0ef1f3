//! `reqwest`-backed fetcher.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

use super::config::FetchConfig;
use super::protocols::{FetchResult, Fetcher};
use crate::errors::{PageWalkError, Result};

/// Fetches pages and images over HTTP with a shared connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl ReqwestFetcher {
    /// Builds a fetcher from `config`.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| PageWalkError::fetch("<client>", e.to_string()))?;
        Ok(Self { client, config })
    }

    fn map_error(&self, url: &Url, err: &reqwest::Error, timeout: Option<Duration>) -> PageWalkError {
        if err.is_timeout() {
            let seconds = timeout.map_or(self.config.timeout_seconds, |t| t.as_secs_f64());
            PageWalkError::timeout(url.as_str(), seconds)
        } else {
            PageWalkError::fetch(url.as_str(), err.to_string())
        }
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(
        &self,
        url: &Url,
        headers: &HashMap<String, String>,
        timeout: Option<Duration>,
    ) -> Result<FetchResult> {
        let started = Instant::now();
        let mut request = self.client.get(url.clone());
        for (key, value) in self.config.headers.iter().chain(headers) {
            request = request.header(key.as_str(), value.as_str());
        }
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.map_error(url, &e, timeout))?;

        let status_code = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_error(url, &e, timeout))?
            .to_vec();

        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        debug!(%url, status_code, bytes = body.len(), duration_ms, "Fetched");

        Ok(FetchResult {
            status_code,
            body,
            content_type,
        })
    }

    fn config(&self) -> &FetchConfig {
        &self.config
    }
}
