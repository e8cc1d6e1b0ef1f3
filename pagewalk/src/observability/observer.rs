//! Observers for pagination runs.

use chrono::{DateTime, Utc};
use std::time::Instant;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::errors::PageWalkError;
use crate::pagination::{PageVisit, StopReason};

/// Observability callbacks for pagination runs.
pub trait PaginationObserver: Send + Sync {
    /// Called before the seed page is fetched.
    fn on_run_start(&self, run_id: Uuid, seed: &Url);

    /// Called after a page was extracted and merged.
    fn on_page_extracted(&self, run_id: Uuid, visit: &PageVisit, accumulated: usize);

    /// Called when fetching or extracting a page fails.
    fn on_page_failed(&self, run_id: Uuid, url: &Url, error: &PageWalkError);

    /// Called once the run stops, successfully or not.
    fn on_run_end(&self, run_id: Uuid, stop: &StopReason, accumulated: usize);
}

/// No-op implementation of `PaginationObserver`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpPaginationObserver;

impl PaginationObserver for NoOpPaginationObserver {
    fn on_run_start(&self, _run_id: Uuid, _seed: &Url) {}
    fn on_page_extracted(&self, _run_id: Uuid, _visit: &PageVisit, _accumulated: usize) {}
    fn on_page_failed(&self, _run_id: Uuid, _url: &Url, _error: &PageWalkError) {}
    fn on_run_end(&self, _run_id: Uuid, _stop: &StopReason, _accumulated: usize) {}
}

/// Observer that logs run progress through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingPaginationObserver;

impl PaginationObserver for LoggingPaginationObserver {
    fn on_run_start(&self, run_id: Uuid, seed: &Url) {
        info!(%run_id, url = %seed, "Pagination run started");
    }

    fn on_page_extracted(&self, run_id: Uuid, visit: &PageVisit, accumulated: usize) {
        info!(
            %run_id,
            url = %visit.url,
            images = visit.images,
            accumulated,
            has_next = visit.next_page_link.is_some(),
            duration_ms = visit.duration_ms,
            "Page extracted"
        );
    }

    fn on_page_failed(&self, run_id: Uuid, url: &Url, error: &PageWalkError) {
        warn!(%run_id, %url, error = %error, kind = error.kind(), "Page failed");
    }

    fn on_run_end(&self, run_id: Uuid, stop: &StopReason, accumulated: usize) {
        info!(%run_id, stop = ?stop, accumulated, "Pagination run ended");
    }
}

/// Wall-clock and monotonic timing for one page visit.
#[derive(Debug)]
pub struct PageTimer {
    started: Instant,
    started_at: DateTime<Utc>,
}

impl PageTimer {
    /// Starts timing now.
    #[must_use]
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// When the timer was started.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }
}
