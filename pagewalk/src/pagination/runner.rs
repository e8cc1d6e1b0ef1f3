//! The page-by-page accumulation loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use super::state::AccumulationState;
use crate::cancellation::CancellationToken;
use crate::errors::{PageWalkError, Result};
use crate::extract::{ExtractionResult, Origin, PageExtractor, ScanStats};
use crate::fetch::{request_headers, FetchConfig, Fetcher};
use crate::observability::{NoOpPaginationObserver, PageTimer, PaginationObserver};
use crate::settings::GallerySettings;

/// One page fetched and extracted during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageVisit {
    /// The page URL.
    pub url: Url,
    /// Images extracted from this page alone.
    pub images: usize,
    /// The page's next link, if any.
    pub next_page_link: Option<Url>,
    /// When the fetch was issued.
    pub fetched_at: DateTime<Utc>,
    /// Fetch and extraction time in milliseconds.
    pub duration_ms: f64,
    /// Extraction counters.
    pub stats: ScanStats,
}

/// Why a run stopped fetching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stop", rename_all = "snake_case")]
pub enum StopReason {
    /// The minimum image count is 0, so only the seed page is fetched.
    ThresholdDisabled,
    /// Enough images were accumulated.
    ThresholdMet,
    /// The last page had no next link.
    NoNextLink,
    /// The configured page cap was reached.
    PageLimit,
    /// The next link points at a page already fetched in this run.
    LoopDetected {
        /// The repeated URL.
        url: Url,
    },
    /// A later page failed; earlier pages are kept.
    Interrupted {
        /// The page that failed.
        url: Url,
        /// The failure, rendered.
        error: String,
    },
    /// The run was cancelled after at least one page.
    Cancelled {
        /// Cancellation reason.
        reason: String,
    },
}

impl StopReason {
    /// Whether the run ended without a failure or cancellation.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !matches!(self, Self::Interrupted { .. } | Self::Cancelled { .. })
    }
}

/// Outcome of one pagination run.
#[derive(Debug, Clone)]
pub struct PaginationRun {
    /// Identifier used in logs and observer callbacks.
    pub run_id: Uuid,
    /// The first page fetched.
    pub seed: Url,
    /// Accumulated images and the held next/previous links.
    pub result: ExtractionResult,
    /// Pages fetched, in order.
    pub pages: Vec<PageVisit>,
    /// Why fetching stopped.
    pub stop: StopReason,
}

impl PaginationRun {
    /// Total accumulated images.
    #[must_use]
    pub fn image_count(&self) -> usize {
        self.result.image_count()
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut dict = HashMap::new();
        dict.insert("run_id".to_string(), serde_json::json!(self.run_id.to_string()));
        dict.insert("seed".to_string(), serde_json::json!(self.seed.as_str()));
        dict.insert("images".to_string(), serde_json::json!(self.image_count()));
        dict.insert("pages".to_string(), serde_json::json!(self.pages.len()));
        dict.insert(
            "stop".to_string(),
            serde_json::to_value(&self.stop).unwrap_or(serde_json::Value::Null),
        );
        dict
    }
}

/// Fetches a chain of pages until the minimum image count is met.
///
/// Pages are fetched strictly one after another: a page is extracted and
/// merged before the next fetch is issued.
pub struct PaginationRunner<F: Fetcher + ?Sized> {
    fetcher: Arc<F>,
    settings: GallerySettings,
    max_pages: Option<usize>,
    fetch_config: Option<FetchConfig>,
    observer: Arc<dyn PaginationObserver>,
}

impl<F: Fetcher + ?Sized> PaginationRunner<F> {
    /// Creates a runner with no page cap and a no-op observer.
    #[must_use]
    pub fn new(fetcher: Arc<F>, settings: GallerySettings) -> Self {
        Self {
            fetcher,
            settings,
            max_pages: None,
            fetch_config: None,
            observer: Arc::new(NoOpPaginationObserver),
        }
    }

    /// Caps the number of pages fetched by one run.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Overrides the fetcher's own timeout and adds extra page headers.
    #[must_use]
    pub fn with_fetch_config(mut self, config: FetchConfig) -> Self {
        self.fetch_config = Some(config);
        self
    }

    /// Sets the observer notified of run progress.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn PaginationObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The settings used for extraction and fetching.
    #[must_use]
    pub fn settings(&self) -> &GallerySettings {
        &self.settings
    }

    /// Runs pagination from `seed`, resolving links against `origin`.
    ///
    /// A failure on the seed page is returned as an error and produces no
    /// state. A failure on a later page ends the run with
    /// [`StopReason::Interrupted`] and keeps what was accumulated.
    pub async fn run(
        &self,
        origin: &Origin,
        seed: &Url,
        cancel: &CancellationToken,
    ) -> Result<PaginationRun> {
        let run_id = Uuid::new_v4();
        self.observer.on_run_start(run_id, seed);

        let extractor = PageExtractor::from_settings(origin.clone(), &self.settings);
        let mut headers = request_headers(origin, self.settings.use_referer);
        if let Some(config) = &self.fetch_config {
            headers.extend(config.headers.clone());
        }
        let min_image_count = self.settings.min_image_count;

        let mut state = AccumulationState::new();
        let mut pages = Vec::new();
        let mut visited = HashSet::new();
        let mut current = seed.clone();

        let stop = loop {
            visited.insert(current.clone());

            match self.visit(&extractor, &current, &headers, cancel).await {
                Ok((page, visit)) => {
                    state.absorb(page);
                    self.observer
                        .on_page_extracted(run_id, &visit, state.image_count());
                    pages.push(visit);
                }
                Err(err) => {
                    self.observer.on_page_failed(run_id, &current, &err);
                    if state.pages_absorbed() == 0 {
                        return Err(err);
                    }
                    break match err {
                        PageWalkError::Cancelled(reason) => StopReason::Cancelled { reason },
                        other => StopReason::Interrupted {
                            url: current,
                            error: other.to_string(),
                        },
                    };
                }
            }

            if min_image_count == 0 {
                break StopReason::ThresholdDisabled;
            }
            if !state.needs_more(min_image_count) {
                break StopReason::ThresholdMet;
            }
            let Some(next) = state.next_link().cloned() else {
                break StopReason::NoNextLink;
            };
            if self.max_pages.is_some_and(|max| pages.len() >= max) {
                break StopReason::PageLimit;
            }
            if visited.contains(&next) {
                break StopReason::LoopDetected { url: next };
            }

            debug!(%run_id, next = %next, accumulated = state.image_count(), "Following next link");
            current = next;
        };

        self.observer.on_run_end(run_id, &stop, state.image_count());

        let result = state
            .into_result()
            .ok_or_else(|| PageWalkError::no_images(seed.as_str()))?;

        Ok(PaginationRun {
            run_id,
            seed: seed.clone(),
            result,
            pages,
            stop,
        })
    }

    async fn visit(
        &self,
        extractor: &PageExtractor,
        url: &Url,
        headers: &HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<(ExtractionResult, PageVisit)> {
        let timer = PageTimer::start();
        let timeout = self
            .fetch_config
            .as_ref()
            .map_or_else(|| self.fetcher.config().timeout(), FetchConfig::timeout);
        let fetch = tokio::time::timeout(timeout, self.fetcher.fetch(url, headers, Some(timeout)));

        let response = match cancel.run_until_cancelled(fetch).await {
            None => return Err(PageWalkError::Cancelled(cancel.reason().unwrap_or_default())),
            Some(Err(_)) => return Err(PageWalkError::timeout(url.as_str(), timeout.as_secs_f64())),
            Some(Ok(response)) => response?,
        };

        let html = response.into_html(url)?;
        let (page, stats) = extractor.extract_with_stats(&html);
        let page = page.ok_or_else(|| PageWalkError::no_images(url.as_str()))?;

        let visit = PageVisit {
            url: url.clone(),
            images: page.image_count(),
            next_page_link: page.next_page_link().cloned(),
            fetched_at: timer.started_at(),
            duration_ms: timer.elapsed_ms(),
            stats,
        };
        Ok((page, visit))
    }
}

impl<F: Fetcher + ?Sized> std::fmt::Debug for PaginationRunner<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginationRunner")
            .field("settings", &self.settings)
            .field("max_pages", &self.max_pages)
            .field("fetch_config", &self.fetch_config)
            .finish_non_exhaustive()
    }
}

/// Runs pagination from `seed`, using the seed's own origin.
pub async fn run_pagination<F: Fetcher + ?Sized>(
    fetcher: Arc<F>,
    seed: &Url,
    settings: &GallerySettings,
    cancel: &CancellationToken,
) -> Result<PaginationRun> {
    let origin = Origin::from_page_url(seed)?;
    PaginationRunner::new(fetcher, settings.clone())
        .run(&origin, seed, cancel)
        .await
}
