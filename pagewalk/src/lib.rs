//! # Pagewalk
//!
//! Image link extraction and gallery pagination over raw HTML.
//!
//! Pagewalk pulls `<img src>` URLs out of a page together with the links
//! of its "next" and "previous" pagination anchors, then follows next
//! links until enough images are collected:
//!
//! - **Forward-only scanning**: three independent cursors over one
//!   immutable buffer, no DOM
//! - **Origin-relative resolution**: relative and `localhost` links resolve
//!   against the page the session started from
//! - **Sequential pagination**: one page in flight at a time, with a
//!   minimum image count, a loop guard and cooperative cancellation
//! - **Image loading**: cached, size-filtered, with an optional `Referer`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pagewalk::prelude::*;
//! use std::sync::Arc;
//!
//! let fetcher = Arc::new(ReqwestFetcher::new(FetchConfig::default())?);
//! let settings = GallerySettings::default().with_min_image_count(40);
//! let seed = parse_page_url("example.com/gallery/1")?;
//!
//! let run = run_pagination(fetcher, &seed, &settings, &CancellationToken::new()).await?;
//! println!("{} images, next: {:?}", run.image_count(), run.result.next_page_link());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod errors;
pub mod extract;
pub mod fetch;
pub mod images;
pub mod observability;
pub mod pagination;
pub mod scanner;
pub mod session;
pub mod settings;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::errors::{PageWalkError, Result};
    pub use crate::extract::{
        extract_page, parse_page_url, ExtractionPayload, ExtractionResult, Origin,
        PageExtractor, ScanStats,
    };
    #[cfg(feature = "http")]
    pub use crate::fetch::ReqwestFetcher;
    pub use crate::fetch::{FetchConfig, FetchResult, Fetcher};
    pub use crate::images::{CachedImage, ImageCache, ImageLoader, LoadedImage, MemoryImageCache};
    pub use crate::observability::{
        init_tracing, LogFormat, LoggingPaginationObserver, NoOpPaginationObserver,
        PaginationObserver,
    };
    pub use crate::pagination::{
        run_pagination, PageVisit, PaginationRun, PaginationRunner, StopReason,
    };
    pub use crate::session::{FixedPageUrl, GallerySession, PageUrlProvider};
    pub use crate::settings::{GalleryConfig, GallerySettings};
}
