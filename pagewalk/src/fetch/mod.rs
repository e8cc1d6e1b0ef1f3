//! HTTP fetch capability.
//!
//! This module provides:
//! - The `Fetcher` protocol consumed by pagination and image loading
//! - `FetchConfig` for timeouts, user agent and extra headers
//! - `ReqwestFetcher`, the default implementation (feature `http`)

mod config;
#[cfg(feature = "http")]
mod http;
mod protocols;

pub use config::FetchConfig;
#[cfg(feature = "http")]
pub use http::ReqwestFetcher;
pub use protocols::{request_headers, FetchResult, Fetcher, REFERER};

#[cfg(test)]
pub use protocols::MockFetcher;
