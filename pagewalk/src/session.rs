//! Browsing session state.
//!
//! A [`GallerySession`] holds what one user browsing a gallery site needs
//! between actions: the origin fixed when browsing began, the page the
//! last run started from, and the committed result of that run with its
//! held next/previous links. Every action goes through the session value;
//! there is no process-wide state.

use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use crate::cancellation::CancellationToken;
use crate::errors::{PageWalkError, Result};
use crate::extract::{parse_page_url, ExtractionResult, Origin};
use crate::fetch::Fetcher;
use crate::images::{ImageCache, ImageLoader, LoadedImage};
use crate::observability::{NoOpPaginationObserver, PaginationObserver};
use crate::pagination::{PaginationRun, PaginationRunner, StopReason};
use crate::settings::GalleryConfig;

/// Reports the URL of the page currently shown in an embedded browser.
pub trait PageUrlProvider: Send + Sync {
    /// The last URL navigated to, if any.
    fn current_page_url(&self) -> Option<Url>;
}

/// A provider that always reports the same URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedPageUrl(pub Option<Url>);

impl PageUrlProvider for FixedPageUrl {
    fn current_page_url(&self) -> Option<Url> {
        self.0.clone()
    }
}

/// One user's browsing session.
pub struct GallerySession<F: Fetcher + ?Sized> {
    fetcher: Arc<F>,
    config: GalleryConfig,
    observer: Arc<dyn PaginationObserver>,
    loader: ImageLoader<F>,
    origin: Option<Origin>,
    current_page: Option<Url>,
    last_run: Option<PaginationRun>,
    cancel: Arc<CancellationToken>,
}

impl<F: Fetcher + ?Sized> GallerySession<F> {
    /// Creates an empty session.
    #[must_use]
    pub fn new(fetcher: Arc<F>, config: GalleryConfig) -> Self {
        let loader = ImageLoader::new(Arc::clone(&fetcher), config.settings.clone())
            .with_fetch_config(config.fetch.clone())
            .with_max_concurrent(config.max_concurrent_images);
        Self {
            fetcher,
            config,
            observer: Arc::new(NoOpPaginationObserver),
            loader,
            origin: None,
            current_page: None,
            last_run: None,
            cancel: Arc::new(CancellationToken::new()),
        }
    }

    /// Sets the observer passed to every pagination run.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn PaginationObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Uses `cache` for image loading.
    #[must_use]
    pub fn with_image_cache(mut self, cache: Arc<dyn ImageCache>) -> Self {
        self.loader = self.loader.with_cache(cache);
        self
    }

    /// Chooses the page to extract from.
    ///
    /// The embedded browser's current URL wins over the address text.
    pub fn seed_url(&self, address_text: &str, provider: &dyn PageUrlProvider) -> Result<Url> {
        match provider.current_page_url() {
            Some(url) => Ok(url),
            None => parse_page_url(address_text),
        }
    }

    /// Starts browsing at `url`, fixing the session origin.
    ///
    /// Any committed result belongs to the previous site and is dropped.
    pub fn begin_browsing(&mut self, url: &Url) -> Result<&Origin> {
        let origin = Origin::from_page_url(url)?;
        info!(origin = %origin, "Browsing started");
        self.current_page = Some(url.clone());
        self.last_run = None;
        Ok(self.origin.insert(origin))
    }

    /// Runs pagination from `url` and commits the accumulated result.
    ///
    /// Uses the origin fixed by [`begin_browsing`](Self::begin_browsing),
    /// or the origin of `url` when browsing never began. On failure the
    /// previously committed state is left untouched.
    pub async fn extract(&mut self, url: &Url) -> Result<&PaginationRun> {
        let origin = match &self.origin {
            Some(origin) => origin.clone(),
            None => Origin::from_page_url(url)?,
        };
        if self.cancel.is_cancelled() {
            self.cancel = Arc::new(CancellationToken::new());
        }
        let cancel = Arc::clone(&self.cancel);

        let runner = PaginationRunner::new(Arc::clone(&self.fetcher), self.config.settings.clone())
            .with_max_pages(self.config.max_pages)
            .with_fetch_config(self.config.fetch.clone())
            .with_observer(Arc::clone(&self.observer));
        let run = runner.run(&origin, url, &cancel).await?;

        if cancel.is_cancelled() {
            debug!(run_id = %run.run_id, "Discarding cancelled run");
            return Err(PageWalkError::Cancelled(cancel.reason().unwrap_or_default()));
        }

        self.origin = Some(origin);
        self.current_page = Some(url.clone());
        Ok(self.last_run.insert(run))
    }

    /// Starts a fresh run from the held next link.
    ///
    /// Returns `Ok(None)` when there is no next link.
    pub async fn next_page(&mut self) -> Result<Option<&PaginationRun>> {
        let Some(next) = self.next_page_link().cloned() else {
            return Ok(None);
        };
        self.extract(&next).await.map(Some)
    }

    /// Starts a fresh run from the held previous link.
    ///
    /// Returns `Ok(None)` when there is no previous link.
    pub async fn previous_page(&mut self) -> Result<Option<&PaginationRun>> {
        let Some(previous) = self.last_page_link().cloned() else {
            return Ok(None);
        };
        self.extract(&previous).await.map(Some)
    }

    /// Loads the committed images that pass the minimum size filter.
    pub async fn load_images(&self) -> Vec<LoadedImage> {
        match (self.result(), &self.origin) {
            (Some(result), Some(origin)) => {
                self.loader
                    .load_displayable(result.image_urls(), origin)
                    .await
            }
            _ => Vec::new(),
        }
    }

    /// Cancels any in-flight run and discards all session state.
    pub fn clear(&mut self) {
        self.cancel.cancel("session cleared");
        self.cancel = Arc::new(CancellationToken::new());
        self.origin = None;
        self.current_page = None;
        self.last_run = None;
        debug!("Session cleared");
    }

    /// Token of the current or next run.
    ///
    /// Cancelling it aborts an in-flight run without committing it.
    #[must_use]
    pub fn cancel_handle(&self) -> Arc<CancellationToken> {
        Arc::clone(&self.cancel)
    }

    /// The session origin.
    #[must_use]
    pub fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    /// The page the committed run started from.
    #[must_use]
    pub fn current_page(&self) -> Option<&Url> {
        self.current_page.as_ref()
    }

    /// The committed result.
    #[must_use]
    pub fn result(&self) -> Option<&ExtractionResult> {
        self.last_run.as_ref().map(|run| &run.result)
    }

    /// Committed image URLs.
    #[must_use]
    pub fn images(&self) -> &[Url] {
        self.result()
            .map(ExtractionResult::image_urls)
            .unwrap_or_default()
    }

    /// Held next link.
    #[must_use]
    pub fn next_page_link(&self) -> Option<&Url> {
        self.result()?.next_page_link()
    }

    /// Held previous link.
    #[must_use]
    pub fn last_page_link(&self) -> Option<&Url> {
        self.result()?.last_page_link()
    }

    /// The committed run.
    #[must_use]
    pub fn last_run(&self) -> Option<&PaginationRun> {
        self.last_run.as_ref()
    }

    /// Why the committed run stopped.
    #[must_use]
    pub fn last_stop(&self) -> Option<&StopReason> {
        self.last_run.as_ref().map(|run| &run.stop)
    }

    /// The session configuration.
    #[must_use]
    pub fn config(&self) -> &GalleryConfig {
        &self.config
    }
}

impl<F: Fetcher + ?Sized> std::fmt::Debug for GallerySession<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GallerySession")
            .field("origin", &self.origin)
            .field("current_page", &self.current_page)
            .field("images", &self.images().len())
            .field("last_stop", &self.last_stop())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchConfig;
    use crate::settings::GallerySettings;
    use crate::testing::{gallery_page, png_bytes, ScriptedFetcher};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const P1: &str = "https://example.com/p/1";
    const P2: &str = "https://example.com/p/2";
    const P3: &str = "https://example.com/p/3";

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn site() -> ScriptedFetcher {
        ScriptedFetcher::new()
            .with_page(P1, gallery_page().images("/a/", 2).link("/p/2", "下一页").build())
            .with_page(
                P2,
                gallery_page()
                    .images("/b/", 2)
                    .link("/p/1", "上一页")
                    .link("/p/3", "下一页")
                    .build(),
            )
            .with_page(P3, gallery_page().images("/c/", 2).link("/p/2", "上一页").build())
    }

    fn session(fetcher: &Arc<ScriptedFetcher>) -> GallerySession<ScriptedFetcher> {
        GallerySession::new(Arc::clone(fetcher), GalleryConfig::default())
    }

    #[test]
    fn test_seed_url_prefers_provider() {
        let session = session(&Arc::new(ScriptedFetcher::new()));

        let from_view = session
            .seed_url("typed.example.com", &FixedPageUrl(Some(url(P2))))
            .unwrap();
        assert_eq!(from_view.as_str(), P2);

        let from_text = session
            .seed_url("typed.example.com/x", &FixedPageUrl(None))
            .unwrap();
        assert_eq!(from_text.as_str(), "https://typed.example.com/x");

        let protocol_relative = session
            .seed_url("//typed.example.com", &FixedPageUrl::default())
            .unwrap();
        assert_eq!(protocol_relative.as_str(), "https://typed.example.com/");
    }

    #[test]
    fn test_begin_browsing_fixes_origin() {
        let mut session = session(&Arc::new(ScriptedFetcher::new()));

        let origin = session.begin_browsing(&url("https://example.com/gallery?id=4")).unwrap();

        assert_eq!(origin.referer(), "https://example.com");
        assert_eq!(session.current_page().map(Url::as_str), Some("https://example.com/gallery?id=4"));
        assert!(session.result().is_none());
    }

    #[tokio::test]
    async fn test_extract_commits_result() {
        let fetcher = Arc::new(site());
        let mut session = session(&fetcher);
        session.begin_browsing(&url(P1)).unwrap();

        let run = session.extract(&url(P1)).await.unwrap();
        assert_eq!(run.image_count(), 2);

        assert_eq!(session.images().len(), 2);
        assert_eq!(session.next_page_link().map(Url::as_str), Some(P2));
        assert!(session.last_page_link().is_none());
        assert_eq!(session.last_stop(), Some(&StopReason::ThresholdDisabled));
    }

    #[tokio::test]
    async fn test_next_and_previous_pages() {
        let fetcher = Arc::new(site());
        let mut session = session(&fetcher);
        session.extract(&url(P1)).await.unwrap();

        session.next_page().await.unwrap().unwrap();
        assert_eq!(session.current_page().map(Url::as_str), Some(P2));
        assert_eq!(session.next_page_link().map(Url::as_str), Some(P3));
        assert_eq!(session.last_page_link().map(Url::as_str), Some(P1));

        session.previous_page().await.unwrap().unwrap();
        assert_eq!(session.current_page().map(Url::as_str), Some(P1));
        assert!(session.previous_page().await.unwrap().is_none());

        assert_eq!(fetcher.requested_urls(), vec![P1, P2, P1]);
    }

    #[tokio::test]
    async fn test_failed_run_keeps_committed_state() {
        let fetcher = Arc::new(site().with_failure(P2, "connection reset"));
        let mut session = session(&fetcher);
        session.extract(&url(P1)).await.unwrap();

        let err = session.next_page().await.unwrap_err();

        assert_eq!(err.kind(), "FetchError");
        assert_eq!(session.current_page().map(Url::as_str), Some(P1));
        assert_eq!(session.images().len(), 2);
    }

    #[tokio::test]
    async fn test_threshold_from_config() {
        let fetcher = Arc::new(site());
        let config = GalleryConfig::default()
            .with_settings(GallerySettings::default().with_min_image_count(5));
        let mut session = GallerySession::new(Arc::clone(&fetcher), config);

        let run = session.extract(&url(P1)).await.unwrap();

        assert_eq!(run.image_count(), 6);
        assert_eq!(run.stop, StopReason::ThresholdMet);
        assert!(session.next_page_link().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_config_timeout_applies_to_runs() {
        let fetcher = Arc::new(site().with_delay(P1, Duration::from_secs(5)));
        let config = GalleryConfig::default().with_fetch(FetchConfig::new().with_timeout(1.0));
        let mut session = GallerySession::new(Arc::clone(&fetcher), config);

        let err = session.extract(&url(P1)).await.unwrap_err();

        assert_eq!(err.kind(), "Timeout");
        assert!(session.result().is_none());
        assert!(session.current_page().is_none());
        assert_eq!(fetcher.requests()[0].timeout, Some(Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_clear_discards_state() {
        let fetcher = Arc::new(site());
        let mut session = session(&fetcher);
        session.begin_browsing(&url(P1)).unwrap();
        session.extract(&url(P1)).await.unwrap();
        let handle = session.cancel_handle();

        session.clear();

        assert!(handle.is_cancelled());
        assert!(session.origin().is_none());
        assert!(session.result().is_none());
        assert!(session.images().is_empty());
        assert!(!session.cancel_handle().is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_run_is_not_committed() {
        let fetcher = Arc::new(
            site().with_delay(P2, Duration::from_secs(5)),
        );
        let config = GalleryConfig::default()
            .with_settings(GallerySettings::default().with_min_image_count(5));
        let mut session = GallerySession::new(Arc::clone(&fetcher), config);
        let handle = session.cancel_handle();

        let task = tokio::spawn(async move {
            let outcome = session.extract(&url(P1)).await.map(|run| run.image_count());
            (session, outcome)
        });
        while fetcher.request_count() < 2 {
            tokio::task::yield_now().await;
        }
        handle.cancel("user cleared");

        let (session, outcome) = task.await.unwrap();
        assert!(outcome.unwrap_err().is_cancelled());
        assert!(session.result().is_none());
    }

    #[tokio::test]
    async fn test_load_images_filters_small() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .with_page(
                    P1,
                    gallery_page().image("/big.png").image("/tiny.png").build(),
                )
                .with_bytes("https://example.com/big.png", png_bytes(300, 300), "image/png")
                .with_bytes("https://example.com/tiny.png", png_bytes(8, 8), "image/png"),
        );
        let config = GalleryConfig::default()
            .with_settings(GallerySettings::default().with_min_image_size_kb(1));
        let mut session = GallerySession::new(Arc::clone(&fetcher), config);
        assert!(session.load_images().await.is_empty());

        session.extract(&url(P1)).await.unwrap();
        let shown = session.load_images().await;

        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].url.as_str(), "https://example.com/big.png");
    }
}
